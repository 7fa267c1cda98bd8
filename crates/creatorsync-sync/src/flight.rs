//! Single-flight guard for run-to-completion jobs.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub(crate) struct InFlight(AtomicBool);

impl InFlight {
    /// Claims the flag. `None` if a run already holds it.
    pub(crate) fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(&self.0))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the flag on drop, including on panic or early return.
pub(crate) struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
