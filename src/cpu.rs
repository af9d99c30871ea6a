//! Home-shard selection: a fast query of the executing CPU.
//!
//! The answer is advisory. A thread migrated between the query and the ring
//! operation simply lands on a slightly colder shard; correctness never
//! depends on the mapping being exact.

/// Index of the CPU the calling thread is currently running on.
#[cfg(all(target_os = "linux", not(miri)))]
#[inline]
pub(crate) fn current_cpu() -> usize {
    // vDSO-backed on common configurations, so this stays cheap enough for
    // the acquire/release hot path.
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu < 0 {
        0
    } else {
        cpu as usize
    }
}

/// Fallback for platforms without a cheap CPU query: hand each thread a
/// sticky home shard round-robin, which preserves the locality argument
/// (one thread keeps hitting one shard) without any syscall.
#[cfg(not(all(target_os = "linux", not(miri))))]
#[inline]
pub(crate) fn current_cpu() -> usize {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_HOME: AtomicUsize = AtomicUsize::new(0);

    thread_local! {
        static HOME: usize = NEXT_HOME.fetch_add(1, Ordering::Relaxed);
    }

    HOME.with(|home| *home)
}
