//! Init-time population: carving a caller buffer into objects and
//! scattering individually contributed objects across shards.
//!
//! Neither operation is thread-safe; both take `&mut self` and belong to
//! the window between construction and the first concurrent use.

use crate::error::PoolError;
use crate::pool::{ObjectPool, UserBuffer};
use std::mem;
use std::ptr::NonNull;

impl ObjectPool {
    /// Carves `size` bytes at `buf` into objects of `object_size` bytes and
    /// distributes them across the shards, registering the buffer so that
    /// teardown can report it back to the caller. Returns the number of
    /// objects added; a final object that exactly consumes the buffer is
    /// included.
    ///
    /// # Safety
    ///
    /// `buf` must be valid for reads and writes of `size` bytes for the
    /// whole life of the pool, must not overlap any pool-owned memory, and
    /// remains owned by the caller: the pool never frees it, it only hands
    /// it back from [`finalize`](ObjectPool::finalize).
    pub unsafe fn populate(
        &mut self,
        buf: NonNull<u8>,
        size: usize,
        object_size: usize,
    ) -> Result<usize, PoolError> {
        if self.user_buffer.is_some() {
            return Err(PoolError::Invalid {
                reason: "a user buffer is already registered",
            });
        }
        if object_size == 0 || size < object_size {
            return Err(PoolError::Invalid {
                reason: "buffer smaller than a single object",
            });
        }
        let align = mem::size_of::<*mut u8>();
        if buf.as_ptr() as usize % align != 0 {
            return Err(PoolError::Invalid {
                reason: "buffer is not pointer-aligned",
            });
        }
        if object_size % align != 0 {
            return Err(PoolError::Invalid {
                reason: "object size is not pointer-aligned",
            });
        }
        if self.object_size != 0 && self.object_size != object_size {
            return Err(PoolError::Invalid {
                reason: "object size differs from the pool's",
            });
        }

        let mut used = 0;
        let mut added = 0;
        while used + object_size <= size {
            // SAFETY: `used + object_size <= size`, so the offset stays
            // inside the caller's buffer.
            let obj = unsafe { NonNull::new_unchecked(buf.as_ptr().add(used)) };
            // SAFETY: forwarded caller contract; each carved object is a
            // disjoint sub-range of `buf`.
            if unsafe { self.scatter_add(obj) }.is_err() {
                break;
            }
            used += object_size;
            added += 1;
        }
        if added == 0 {
            return Err(PoolError::Full);
        }

        self.user_buffer = Some(UserBuffer {
            base: buf,
            bytes: size,
        });
        self.object_size = object_size;
        Ok(added)
    }

    /// Adds one individually allocated object, rotating the starting shard
    /// by the running count to keep the starting populations balanced.
    ///
    /// Fails with [`PoolError::Full`] once the shards together cannot take
    /// another object (over-provisioned pool).
    ///
    /// # Safety
    ///
    /// `obj` must be valid for reads and writes of the pool's object size
    /// for the whole life of the pool, must not be contributed twice, and
    /// remains owned by the caller past
    /// [`finalize`](ObjectPool::finalize).
    pub unsafe fn scatter_add(&mut self, obj: NonNull<u8>) -> Result<(), PoolError> {
        let nshards = self.shards.len();
        if u64::from(self.count) >= u64::from(self.per_shard_capacity) * nshards as u64 {
            return Err(PoolError::Full);
        }

        let start = self.count as usize % nshards;
        for step in 0..nshards {
            if self.shards[(start + step) % nshards].slot.try_push(obj) {
                self.count += 1;
                return Ok(());
            }
        }
        Err(PoolError::Full)
    }
}
