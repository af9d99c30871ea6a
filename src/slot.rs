use crate::invariants::{
    debug_assert_bounded_count, debug_assert_monotonic, debug_assert_published_entry,
};
use crossbeam_utils::CachePadded;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Each shard is a bounded MPMC ring of object pointers with a parallel array
// of 32-bit epoch tags. The tags are the ABA defense: an entry at index
// `i = k & mask` is consumable only while `ages[i] == k`, and a given index's
// tag advances by `capacity` per wrap, so a stale snapshot of `head` can
// never match a recycled entry.
//
// ## Position counters
//
// `head` and `tail` are 32-bit counters that wrap. All comparisons use
// counter equality or wrapping distance, never ordering of the wrapped
// values. Both counters start at `capacity` rather than 0, so the first
// consumable epoch (`capacity`) can never equal the zeroed initial `ages[]`;
// this closes a first-item race where a producer stalled between reserving
// index 0 and publishing its tag would look complete to a consumer.
//
// ## Producer protocol
//
// 1. Reserve an index: fetch-add `tail` (unbounded form) or CAS `tail`
//    forward after a capacity check (bounded form).
// 2. Store `entries[k & mask]` (plain).
// 3. Publish `ages[k & mask] = k` with Release.
//
// ## Consumer protocol
//
// 1. Load `head` with Acquire, compare against `tail`.
// 2. Load `ages[i]` with Acquire. A match means step 3 of some producer
//    happened-before this load, so the entry read below is the published one.
// 3. Read `entries[i]`, then claim the epoch by CASing `head` forward
//    (Release on success).
// 4. On any sign of a stalled peer (tag mismatch with an unchanged `head`),
//    give up instead of spinning: the caller walks to the next shard. This
//    is what makes the pool safe to enter from nested, non-preemptible
//    contexts; no invocation ever waits on another's progress.
//
// =============================================================================

/// Bounded MPMC ring of object pointers, one per shard.
///
/// All three operations are lock-free, re-entrant with respect to each other
/// and never block, yield or allocate.
pub(crate) struct Slot {
    /// Consumer position. Isolated on its own cache line so producers
    /// hammering `tail` do not invalidate it.
    head: CachePadded<AtomicU32>,
    /// Producer position.
    tail: CachePadded<AtomicU32>,
    capacity: u32,
    mask: u32,
    /// Epoch tag per ring index; equals the position counter at which the
    /// index was last produced.
    ages: Box<[AtomicU32]>,
    /// Object pointers, valid only while the matching age tag is current.
    entries: Box<[AtomicPtr<u8>]>,
}

impl Slot {
    /// Creates an empty ring. `capacity` must be a power of two.
    pub(crate) fn new(capacity: u32) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            head: CachePadded::new(AtomicU32::new(capacity)),
            tail: CachePadded::new(AtomicU32::new(capacity)),
            capacity,
            mask: capacity - 1,
            ages: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
            entries: (0..capacity)
                .map(|_| AtomicPtr::new(ptr::null_mut()))
                .collect(),
        }
    }

    /// Test-only: an empty ring whose counters sit at `base`, as if
    /// `base - capacity` objects had already cycled through. Used to
    /// exercise counter wrap without 2^32 operations.
    #[cfg(test)]
    pub(crate) fn with_base(capacity: u32, base: u32) -> Self {
        let slot = Self::new(capacity);
        slot.head.store(base, Ordering::Relaxed);
        slot.tail.store(base, Ordering::Relaxed);
        for k in 0..capacity {
            let epoch = base.wrapping_sub(capacity).wrapping_add(k);
            slot.ages[(epoch & slot.mask) as usize].store(epoch, Ordering::Relaxed);
        }
        slot
    }

    /// Current item count. Racy under concurrency, exact when quiescent.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// Unbounded enqueue, for rings that cannot fill: the pool only routes
    /// here while its whole population fits in a single shard, and init-time
    /// seeding never exceeds capacity.
    pub(crate) fn push(&self, obj: NonNull<u8>) {
        let tail = self.tail.fetch_add(1, Ordering::Relaxed);
        let idx = (tail & self.mask) as usize;
        self.entries[idx].store(obj.as_ptr(), Ordering::Relaxed);
        // Publish: pairs with the consumer's Acquire load of the same tag.
        self.ages[idx].store(tail, Ordering::Release);

        debug_assert_bounded_count!(
            tail.wrapping_add(1)
                .wrapping_sub(self.head.load(Ordering::Relaxed)),
            self.capacity
        );
    }

    /// Bounded enqueue. Returns `false` if the ring is full.
    pub(crate) fn try_push(&self, obj: NonNull<u8>) -> bool {
        let mut tail = self.tail.load(Ordering::Acquire);
        loop {
            let head = self.head.load(Ordering::Acquire);
            if tail.wrapping_sub(head) >= self.capacity {
                return false;
            }
            match self.tail.compare_exchange(
                tail,
                tail.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => {
                    debug_assert_monotonic!("tail", tail, current);
                    tail = current;
                }
            }
        }
        let idx = (tail & self.mask) as usize;
        self.entries[idx].store(obj.as_ptr(), Ordering::Relaxed);
        self.ages[idx].store(tail, Ordering::Release);
        true
    }

    /// Dequeue. Returns `None` when the ring is empty *or* when its
    /// producer side appears stalled; the caller falls back to the next
    /// shard rather than spinning on this one.
    pub(crate) fn try_pop(&self) -> Option<NonNull<u8>> {
        let mut head = self.head.load(Ordering::Acquire);
        while head != self.tail.load(Ordering::Relaxed) {
            let idx = (head & self.mask) as usize;

            if self.ages[idx].load(Ordering::Acquire) == head {
                // The epoch is current: the entry below is the pointer the
                // producer published before the tag.
                let obj = self.entries[idx].load(Ordering::Relaxed);
                match self.head.compare_exchange(
                    head,
                    head.wrapping_add(1),
                    Ordering::Release,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        debug_assert_published_entry!(obj, head);
                        // SAFETY: a consumable entry is stored non-null
                        // before its tag is published.
                        return Some(unsafe { NonNull::new_unchecked(obj) });
                    }
                    Err(current) => {
                        // Another consumer claimed this epoch first.
                        debug_assert_monotonic!("head", head, current);
                        head = current;
                        continue;
                    }
                }
            }

            // Tag mismatch: either a producer is mid-publication on this
            // index, or we lost a race and our snapshot is stale.
            let current = self.head.load(Ordering::Acquire);
            if current == head {
                // head did not move, so we are likely preempting an
                // unfinished push or pop. Bail out; waiting here could
                // deadlock a nested context against the one it interrupted.
                return None;
            }
            head = current;
        }
        None
    }
}
