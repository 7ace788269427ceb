use std::{fmt::Debug, time::Instant};

/// Source of monotonic time for the batch timer and retry schedule.
pub trait Clock: Debug + Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
