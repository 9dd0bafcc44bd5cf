use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{PanelError, Result};

/// Fixed-capacity FIFO between message producers and the transmitter.
///
/// `append` adds at the tail for ordinary commands; `prepend` adds at the
/// head so acknowledgments jump ahead of anything already waiting. Both
/// block while the queue is full instead of dropping. Closing the queue
/// wakes every waiter; `take` then reports [`PanelError::QueueClosed`].
pub struct TransferQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
    drained: Condvar,
}

struct State<T> {
    items: VecDeque<T>,
    /// Items taken but not yet marked done, plus items still queued.
    unfinished: usize,
    closed: bool,
}

#[derive(Clone, Copy)]
enum End {
    Head,
    Tail,
}

impl<T> TransferQueue<T> {
    /// Create a queue. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                unfinished: 0,
                closed: false,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Add at the tail, blocking while full.
    pub fn append(&self, item: T) -> Result<()> {
        self.insert(item, End::Tail, None)
    }

    /// Add at the head, blocking while full.
    pub fn prepend(&self, item: T) -> Result<()> {
        self.insert(item, End::Head, None)
    }

    /// Add at the tail, giving up with [`PanelError::QueueFull`] after `timeout`.
    pub fn append_timeout(&self, item: T, timeout: Duration) -> Result<()> {
        self.insert(item, End::Tail, Some(timeout))
    }

    /// Add at the head, giving up with [`PanelError::QueueFull`] after `timeout`.
    pub fn prepend_timeout(&self, item: T, timeout: Duration) -> Result<()> {
        self.insert(item, End::Head, Some(timeout))
    }

    fn insert(&self, item: T, end: End, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(PanelError::QueueClosed);
            }
            if state.items.len() < self.capacity {
                break;
            }
            state = match deadline {
                None => self
                    .not_full
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(PanelError::QueueFull(timeout.unwrap_or_default()));
                    }
                    self.not_full
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }

        match end {
            End::Head => state.items.push_front(item),
            End::Tail => state.items.push_back(item),
        }
        state.unfinished += 1;
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head item, blocking while the queue is empty.
    ///
    /// Returns [`PanelError::QueueClosed`] once the queue is closed, even if
    /// items remain.
    pub fn take(&self) -> Result<T> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(PanelError::QueueClosed);
            }
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Ok(item);
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark one previously taken item as fully processed.
    pub fn task_done(&self) {
        let mut state = self.lock();
        state.unfinished = state.unfinished.saturating_sub(1);
        if state.unfinished == 0 {
            self.drained.notify_all();
        }
    }

    /// Block until every inserted item has been taken and marked done.
    ///
    /// Returns false on timeout or if the queue was closed with work
    /// outstanding.
    pub fn wait_until_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.unfinished == 0 {
                return true;
            }
            if state.closed {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .drained
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Close the queue and wake all waiters. Returns the number of items
    /// that were still queued and are now discarded.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let discarded = state.items.len();
        state.items.clear();
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        self.drained.notify_all();
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for TransferQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("TransferQueue")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .finish()
    }
}
