use std::time::{Duration, Instant};

/// Holds back a rapidly changing value until it has been stable for a quiet period.
///
/// The debouncer is clock-agnostic: callers pass the current [`Instant`] so the
/// same logic drives both the async session worker and deterministic tests.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    changed_at: Instant,
}

impl<T> Debouncer<T> {
    /// Creates a debouncer that settles values after `quiet` has elapsed.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Records a new value and restarts the wait.
    ///
    /// A value that was still pending is discarded.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            changed_at: now,
        });
    }

    /// Instant at which the pending value settles, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
            .as_ref()
            .map(|pending| pending.changed_at + self.quiet)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the pending value once the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.pending.take().map(|pending| pending.value),
            _ => None,
        }
    }

    /// Takes the pending value without waiting for the quiet period.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }
}
