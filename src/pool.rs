use crate::arena::{AllocStrategy, Arena};
use crate::config::{per_shard_capacity, PoolConfig, MAX_SHARDS, MAX_TOTAL_OBJECTS};
use crate::cpu;
use crate::error::PoolError;
use crate::slot::Slot;
use crate::stats::{PoolStats, ShardStats};
use std::mem;
use std::num::NonZeroUsize;
use std::ptr::NonNull;
use std::thread;

/// One per-CPU partition: a ring plus (for self-managed pools) the single
/// allocation backing that ring's objects.
pub(crate) struct Shard {
    pub(crate) slot: Slot,
    pub(crate) arena: Option<Arena>,
    pub(crate) stats: ShardStats,
}

/// Caller-provided buffer registered through `populate`. The pool records
/// the range for teardown classification but never dereferences it itself.
pub(crate) struct UserBuffer {
    pub(crate) base: NonNull<u8>,
    pub(crate) bytes: usize,
}

/// A fixed-capacity, multi-producer/multi-consumer reservoir of
/// pre-allocated fixed-size objects, sharded per logical CPU.
///
/// After [`ObjectPool::new`] (and any init-time [`populate`] /
/// [`scatter_add`] calls), [`acquire`] and [`release`] are safe under
/// arbitrary concurrency, never block, never allocate, and are re-entrant:
/// an interrupt-like context may call into the pool while preempting a
/// thread that is itself inside an operation on the same pool.
///
/// Objects are handed out in no particular order; a freshly acquired object
/// must be treated as uninitialized.
///
/// [`populate`]: ObjectPool::populate
/// [`scatter_add`]: ObjectPool::scatter_add
/// [`acquire`]: ObjectPool::acquire
/// [`release`]: ObjectPool::release
pub struct ObjectPool {
    pub(crate) shards: Box<[Shard]>,
    /// Object size in bytes, pointer-aligned; zero when the pool owns no
    /// object bytes (population comes from the caller).
    pub(crate) object_size: usize,
    /// Live objects currently managed by the pool. Mutated only by the
    /// init-time `&mut self` operations.
    pub(crate) count: u32,
    pub(crate) per_shard_capacity: u32,
    pub(crate) stats_enabled: bool,
    pub(crate) user_buffer: Option<UserBuffer>,
}

// SAFETY: shard state is shared exclusively through atomics; the arenas and
// the user buffer are byte ranges the pool never dereferences. Exclusive
// access to a given object's bytes is transferred with the pointer itself
// through acquire/release.
unsafe impl Send for ObjectPool {}
unsafe impl Sync for ObjectPool {}

impl ObjectPool {
    /// Builds the pool: derives the per-shard capacity, allocates one ring
    /// per shard and, when `object_size > 0`, seeds `total_objects`
    /// pre-allocated zeroed objects split evenly across the shards.
    ///
    /// Partially allocated shards are released again if a later allocation
    /// fails.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let nshards = config
            .shards
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get));
        if nshards == 0 || nshards > MAX_SHARDS {
            return Err(PoolError::Invalid {
                reason: "unsupported shard count",
            });
        }
        if config.total_objects > MAX_TOTAL_OBJECTS {
            return Err(PoolError::Invalid {
                reason: "total object count too large",
            });
        }
        if config.asymmetry > config.total_objects {
            return Err(PoolError::Invalid {
                reason: "asymmetry exceeds total objects",
            });
        }

        let total = config.total_objects;
        let object_size = align_up(config.object_size, mem::size_of::<*mut u8>());
        let capacity = per_shard_capacity(total, nshards, config.asymmetry);

        // The strategy is decided once, from the most populated shard.
        let strategy = AllocStrategy::select(
            config.alloc_hint,
            objects_for_shard(total, nshards, 0) as usize * object_size,
        );

        let mut shards = Vec::with_capacity(nshards);
        for i in 0..nshards {
            let nobjs = objects_for_shard(total, nshards, i);
            let slot = Slot::new(capacity);
            let arena = if object_size > 0 && nobjs > 0 {
                // A failure here drops the shards built so far, arenas
                // included.
                let arena = Arena::zeroed(nobjs as usize * object_size, strategy)?;
                for j in 0..nobjs as usize {
                    slot.push(arena.at(j * object_size));
                }
                Some(arena)
            } else {
                None
            };
            shards.push(Shard {
                slot,
                arena,
                stats: ShardStats::default(),
            });
        }

        Ok(Self {
            shards: shards.into_boxed_slice(),
            object_size,
            // Rings sized for `total` but seeded with nothing: the live
            // count grows through populate/scatter_add instead.
            count: if object_size > 0 { total } else { 0 },
            per_shard_capacity: capacity,
            stats_enabled: config.enable_stats,
            user_buffer: None,
        })
    }

    /// Takes an object out of the pool, or `None` if every shard is empty.
    ///
    /// Starts at the caller's home shard and visits each shard exactly once
    /// in forward order. Never blocks; callable from nested contexts.
    pub fn acquire(&self) -> Option<NonNull<u8>> {
        let nshards = self.shards.len();
        let home = cpu::current_cpu() % nshards;

        for step in 0..nshards {
            let shard = &self.shards[(home + step) % nshards];
            if let Some(obj) = shard.slot.try_pop() {
                if self.stats_enabled {
                    shard.stats.record_hit(step > 0);
                }
                return Some(obj);
            }
        }

        if self.stats_enabled {
            self.shards[home].stats.record_miss();
        }
        None
    }

    /// Returns an object to the pool.
    ///
    /// The walk mirrors `acquire`; because the shards together always have
    /// room for every pool object, a full walk failing means the caller
    /// handed back a pointer the pool did not hand out (double release).
    ///
    /// # Safety
    ///
    /// `obj` must have been obtained from this pool — via [`acquire`], or
    /// as one of the objects contributed at init time — and must not have
    /// been released since it was last acquired. The caller forfeits access
    /// to the object's bytes.
    ///
    /// [`acquire`]: ObjectPool::acquire
    pub unsafe fn release(&self, obj: NonNull<u8>) -> Result<(), PoolError> {
        let nshards = self.shards.len();
        let home = cpu::current_cpu() % nshards;

        // A population that fits inside one shard can never fill any ring,
        // so the reservation can skip the capacity check entirely.
        if self.count <= self.per_shard_capacity {
            let shard = &self.shards[home];
            shard.slot.push(obj);
            if self.stats_enabled {
                shard.stats.record_release();
            }
            return Ok(());
        }

        for step in 0..nshards {
            let shard = &self.shards[(home + step) % nshards];
            if shard.slot.try_push(obj) {
                if self.stats_enabled {
                    shard.stats.record_release();
                }
                return Ok(());
            }
        }
        Err(PoolError::Full)
    }

    /// Objects currently sitting in the pool. Racy under concurrency,
    /// exact when quiescent.
    pub fn available(&self) -> usize {
        self.shards.iter().map(|s| s.slot.len()).sum()
    }

    /// Object size in bytes (pointer-aligned), or zero for pools that own
    /// no object bytes.
    #[inline]
    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// Number of shards (one per logical CPU unless overridden).
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Ring capacity of each shard.
    #[inline]
    pub fn per_shard_capacity(&self) -> u32 {
        self.per_shard_capacity
    }

    /// Live objects managed by the pool (seeded plus contributed).
    #[inline]
    pub fn total_objects(&self) -> u32 {
        self.count
    }

    /// Aggregated counters; all zero unless stats were enabled.
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();
        for shard in &self.shards {
            stats.absorb(&shard.stats);
        }
        stats
    }
}

/// Objects assigned to shard `i` under even distribution: the remainder
/// goes to the lowest-numbered shards.
pub(crate) fn objects_for_shard(total: u32, nshards: usize, i: usize) -> u32 {
    total / nshards as u32 + u32::from((i as u32) < total % nshards as u32)
}

pub(crate) fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}
