//! Thin shims over platform thread facilities.
//!
//! Everything here degrades to a no-op where the underlying facility is
//! unavailable; scheduling correctness never depends on it. Worker thread
//! names go through `std::thread::Builder` at spawn time instead.

/// Scheduling priority requested for worker and adopted threads.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ThreadPriority {
    #[default]
    Normal,
    /// Ask the OS to favor these threads. On most desktop platforms raising
    /// a thread's priority needs elevated privileges, in which case the
    /// request is silently ignored.
    Elevated,
}

pub(crate) fn set_current_thread_priority(_priority: ThreadPriority) {
    // No portable, unprivileged way to do this from here; embedders that
    // need real priorities can set them from a start handler.
}

/// Pins the calling thread to one core, round-robin over the visible set.
pub(crate) fn pin_current_thread(index: usize) {
    if let Some(cores) = core_affinity::get_core_ids() {
        if !cores.is_empty() {
            core_affinity::set_for_current(cores[index % cores.len()]);
        }
    }
}
