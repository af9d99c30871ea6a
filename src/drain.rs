//! Teardown: drain every shard, classify every pointer, report each object
//! exactly once, then release the backing storage.

use crate::pool::ObjectPool;
use std::ptr::NonNull;

/// Ownership class reported for each pointer handed to the
/// [`finalize`](ObjectPool::finalize) callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainKind {
    /// The object's bytes live inside a shard allocation; the pool frees
    /// them along with the shard, the callback only observes.
    Pooled,
    /// The object was carved out of the registered user buffer. The buffer
    /// itself is reported separately, once, as [`DrainKind::UserBuffer`].
    BufferElement,
    /// An individually contributed object; reclaiming its memory is the
    /// callback's job.
    Foreign,
    /// The registered user buffer wrapper, reported exactly once after all
    /// elements have been drained.
    UserBuffer,
}

impl ObjectPool {
    /// Drains the pool and invokes `release` exactly once per object still
    /// inside it, then once more for the registered user buffer (if any).
    /// Consuming `self` frees all pool-owned memory afterwards, so
    /// use-after-teardown is a compile error rather than a runtime hazard.
    ///
    /// The callback runs serially. Objects still held by callers at this
    /// point are not visited; draining every shard while holders remain is
    /// a caller bug, as their pointers die with the pool.
    pub fn finalize<F>(mut self, mut release: F)
    where
        F: FnMut(NonNull<u8>, DrainKind),
    {
        for i in 0..self.shards.len() {
            // No concurrency remains (we own the pool), so a `None` from
            // the ring means genuinely empty, not a stalled peer.
            while let Some(obj) = self.shards[i].slot.try_pop() {
                let kind = self.classify(obj.as_ptr());
                release(obj, kind);
            }
        }

        if let Some(buffer) = self.user_buffer.take() {
            release(buffer.base, DrainKind::UserBuffer);
        }
        // Shard rings and arenas are freed by drop glue as `self` goes out
        // of scope.
    }

    /// Ownership class of a drained pointer: inside a shard arena, inside
    /// the user buffer, or foreign.
    fn classify(&self, p: *mut u8) -> DrainKind {
        if self
            .shards
            .iter()
            .any(|s| s.arena.as_ref().is_some_and(|a| a.contains(p)))
        {
            return DrainKind::Pooled;
        }
        if let Some(buffer) = &self.user_buffer {
            let base = buffer.base.as_ptr() as usize;
            let addr = p as usize;
            if addr >= base && addr < base + buffer.bytes {
                return DrainKind::BufferElement;
            }
        }
        DrainKind::Foreign
    }
}
