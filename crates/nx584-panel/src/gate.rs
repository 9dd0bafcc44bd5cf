use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Outcome of waiting on the [`HandshakeGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateWait {
    /// The panel signalled readiness; readiness was consumed.
    Ready,
    /// The timeout elapsed first.
    TimedOut,
    /// The gate was closed during shutdown.
    Closed,
}

/// "Panel is ready for the next frame" flag shared by the transmitter and
/// receiver.
///
/// Starts ready so the first send is not held back. The receiver opens the
/// gate on every inbound frame; the transmitter consumes readiness before
/// each send.
#[derive(Debug)]
pub struct HandshakeGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Debug)]
struct GateState {
    ready: bool,
    closed: bool,
}

impl HandshakeGate {
    pub fn new(ready: bool) -> Self {
        Self {
            state: Mutex::new(GateState {
                ready,
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Set the flag and wake every waiter.
    pub fn set(&self, ready: bool) {
        let mut state = self.lock();
        if state.ready != ready {
            state.ready = ready;
            self.changed.notify_all();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    /// Block until the gate is ready, without consuming readiness.
    pub fn wait_until_ready(&self, timeout: Duration) -> GateWait {
        self.wait(timeout, false)
    }

    /// Block until the gate is ready, then clear it.
    ///
    /// On timeout the flag is cleared as well, so the next cycle waits for
    /// a fresh signal from the panel.
    pub fn take_ready(&self, timeout: Duration) -> GateWait {
        self.wait(timeout, true)
    }

    fn wait(&self, timeout: Duration, consume: bool) -> GateWait {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        let outcome = loop {
            if state.closed {
                return GateWait::Closed;
            }
            if state.ready {
                break GateWait::Ready;
            }
            let now = Instant::now();
            if now >= deadline {
                break GateWait::TimedOut;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        };
        if consume {
            state.ready = false;
        }
        outcome
    }

    /// Wake every waiter with [`GateWait::Closed`]. Further waits return
    /// immediately.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HandshakeGate {
    fn default() -> Self {
        Self::new(true)
    }
}
