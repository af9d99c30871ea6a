//! Per-shard object storage.
//!
//! When the pool manages its own objects, each shard carries exactly one
//! arena: a single zeroed allocation holding that shard's object bytes.
//! The arena also answers the membership question the finalizer asks at
//! teardown ("does this pointer belong to a shard allocation?").

use crate::config::{AllocHint, CACHE_LINE};
use crate::error::PoolError;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// How a shard arena is allocated, decided once at pool construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AllocStrategy {
    /// Plain heap allocation; right for small arenas and for callers that
    /// cannot tolerate reclaim.
    Heap,
    /// Anonymous page mapping; right for arenas spanning at least a page
    /// when the caller allows it.
    #[cfg(unix)]
    PageMapped,
}

impl AllocStrategy {
    /// Picks the strategy from the caller's hint and the computed arena
    /// size: reclaim-averse callers and sub-page arenas stay on the heap.
    pub(crate) fn select(hint: AllocHint, bytes: usize) -> Self {
        #[cfg(unix)]
        {
            if hint == AllocHint::NoReclaim || bytes < page_size() {
                AllocStrategy::Heap
            } else {
                AllocStrategy::PageMapped
            }
        }
        #[cfg(not(unix))]
        {
            let _ = (hint, bytes);
            AllocStrategy::Heap
        }
    }
}

#[cfg(unix)]
pub(crate) fn page_size() -> usize {
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz <= 0 {
        4096
    } else {
        sz as usize
    }
}

/// One shard's object bytes: a single zeroed allocation.
pub(crate) struct Arena {
    base: NonNull<u8>,
    /// Allocated length; for page mappings this is rounded up to whole pages.
    bytes: usize,
    strategy: AllocStrategy,
}

// SAFETY: the arena is a plain byte range. The pool hands out disjoint
// object pointers into it and never reads or writes through `base` itself;
// synchronization of object contents is the holder's concern.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Allocates `bytes` of zeroed storage with the given strategy.
    pub(crate) fn zeroed(bytes: usize, strategy: AllocStrategy) -> Result<Self, PoolError> {
        match strategy {
            AllocStrategy::Heap => {
                let layout = Self::heap_layout(bytes)?;
                // SAFETY: layout has non-zero size (guarded by heap_layout).
                let ptr = unsafe { alloc::alloc_zeroed(layout) };
                let base = NonNull::new(ptr).ok_or(PoolError::OutOfMemory { bytes })?;
                Ok(Self {
                    base,
                    bytes,
                    strategy,
                })
            }
            #[cfg(unix)]
            AllocStrategy::PageMapped => {
                let len = bytes.div_ceil(page_size()) * page_size();
                // SAFETY: anonymous private mapping, no fd involved; the
                // kernel hands back zeroed pages.
                let ptr = unsafe {
                    libc::mmap(
                        std::ptr::null_mut(),
                        len,
                        libc::PROT_READ | libc::PROT_WRITE,
                        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                        -1,
                        0,
                    )
                };
                if ptr == libc::MAP_FAILED {
                    return Err(PoolError::OutOfMemory { bytes: len });
                }
                // SAFETY: mmap success never returns null.
                let base = unsafe { NonNull::new_unchecked(ptr.cast::<u8>()) };
                Ok(Self {
                    base,
                    bytes: len,
                    strategy,
                })
            }
        }
    }

    fn heap_layout(bytes: usize) -> Result<Layout, PoolError> {
        if bytes == 0 {
            return Err(PoolError::Invalid {
                reason: "zero-sized arena",
            });
        }
        Layout::from_size_align(bytes, CACHE_LINE).map_err(|_| PoolError::Invalid {
            reason: "arena size overflows the address space",
        })
    }

    /// Pointer to the object starting at `offset` bytes.
    pub(crate) fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset < self.bytes);
        // SAFETY: offset stays inside the allocation, so the result is
        // non-null and in-bounds.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }

    /// Whether `p` lies inside this arena.
    pub(crate) fn contains(&self, p: *mut u8) -> bool {
        let base = self.base.as_ptr() as usize;
        let addr = p as usize;
        addr >= base && addr < base + self.bytes
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        match self.strategy {
            AllocStrategy::Heap => {
                // SAFETY: allocated in `zeroed` with this exact layout.
                if let Ok(layout) = Self::heap_layout(self.bytes) {
                    unsafe { alloc::dealloc(self.base.as_ptr(), layout) };
                }
            }
            #[cfg(unix)]
            AllocStrategy::PageMapped => {
                // SAFETY: `base`/`bytes` describe the mapping created in
                // `zeroed`; nothing else unmaps it.
                unsafe { libc::munmap(self.base.as_ptr().cast(), self.bytes) };
            }
        }
    }
}
