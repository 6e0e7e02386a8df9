//! Thread affinity, generalized from the original implementation's
//! `pthread_setaffinity_np`-based `setThreadCore` into a thin abstraction
//! that degrades to a no-op rather than aborting when affinity can't be set.

/// Pins the calling thread to `core_id`. Returns `false` (instead of
/// panicking or aborting) when the platform or core is unavailable, so
/// callers can proceed unpinned.
pub fn pin_current_thread_to(core_id: usize) -> bool {
    let Some(core_ids) = core_affinity::get_core_ids() else {
        return false;
    };
    let Some(target) = core_ids.into_iter().find(|c| c.id == core_id) else {
        return false;
    };
    core_affinity::set_for_current(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_core_does_not_panic() {
        assert!(!pin_current_thread_to(usize::MAX));
    }
}
