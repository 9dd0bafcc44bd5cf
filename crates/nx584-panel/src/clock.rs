use chrono::{Local, NaiveDateTime};

/// Source of the wall-clock time sent to the panel.
pub trait WallClock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl WallClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
