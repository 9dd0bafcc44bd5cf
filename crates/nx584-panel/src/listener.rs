use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nx584_frame::Message;

/// Receives every frame that passes checksum verification.
///
/// Notifications run synchronously on the receiver thread, in registration
/// order. A listener that blocks stalls frame reception for the whole
/// connection, so hand long work off to another thread. A panicking
/// listener is logged and skipped; the other listeners still run.
pub trait PanelListener: Send + Sync {
    /// Called with the low six bits of the type byte and the full message.
    fn on_message(&self, type_code: u8, message: &Message);
}

impl<F> PanelListener for F
where
    F: Fn(u8, &Message) + Send + Sync,
{
    fn on_message(&self, type_code: u8, message: &Message) {
        self(type_code, message)
    }
}

/// Ordered set of listeners.
///
/// Identity is the `Arc` allocation: registering the same `Arc` twice is a
/// no-op. Dispatch works on a snapshot, so listeners may subscribe or
/// unsubscribe (themselves included) from inside a callback.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<Arc<dyn PanelListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Returns false if it was already registered.
    pub fn register(&self, listener: Arc<dyn PanelListener>) -> bool {
        let mut listeners = self.lock();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove every registration of `listener`. Returns how many were removed.
    pub fn unregister(&self, listener: &Arc<dyn PanelListener>) -> usize {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        before - listeners.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Notify every listener registered at the time of the call.
    ///
    /// Returns the number of listeners that panicked.
    pub fn dispatch(&self, type_code: u8, message: &Message) -> usize {
        let snapshot: Vec<Arc<dyn PanelListener>> = self.lock().clone();
        let mut faults = 0;
        for listener in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                listener.on_message(type_code, message);
            }));
            if outcome.is_err() {
                faults += 1;
                tracing::error!(type_code, "listener panicked; continuing with the rest");
            }
        }
        faults
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn PanelListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

fn same_listener(a: &Arc<dyn PanelListener>, b: &Arc<dyn PanelListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
