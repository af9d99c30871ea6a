/// Cache line size assumed for layout decisions.
pub(crate) const CACHE_LINE: usize = 64;

/// Bytes of ring bookkeeping that share the slot's first cache line
/// (head, tail, capacity, mask: four 32-bit words).
const SLOT_HEADER: usize = 16;

/// Smallest per-shard ring capacity: the largest power of two of
/// (age, entry) pairs that fit in one cache line next to the bookkeeping,
/// `(64 - 16) / (4 + 8)` rounded down.
pub(crate) const MIN_SHARD_CAPACITY: u32 = 1 << ((CACHE_LINE - SLOT_HEADER) / (4 + 8)).ilog2();

/// Upper bound on the shard count; position counters and epoch tags are
/// 32-bit and must cover every shard's traffic.
pub(crate) const MAX_SHARDS: usize = 1 << 16;

/// Upper bound on the object count, keeping the capacity derivation inside
/// 32-bit arithmetic.
pub(crate) const MAX_TOTAL_OBJECTS: u32 = 1 << 30;

/// Whether the caller's context tolerates large, reclaimable allocations.
///
/// The pool allocates exactly once per shard at construction; this hint only
/// selects *how* that allocation is made. It is captured once and never
/// consulted on the acquire/release path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocHint {
    /// Large shards may come from page-mapped, node-friendly memory.
    #[default]
    AllowReclaim,
    /// The caller cannot tolerate memory reclaim; stick to small heap
    /// allocations regardless of shard size.
    NoReclaim,
}

/// Configuration for [`crate::ObjectPool::new`].
///
/// `total_objects` and `object_size` describe the pre-allocated population;
/// passing `object_size == 0` builds an empty pool whose rings are sized for
/// `total_objects` and filled later via `populate` or `scatter_add`.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Total objects the pool is sized for.
    pub total_objects: u32,
    /// Size of one object in bytes; rounded up to pointer alignment.
    /// Zero means the pool owns no object bytes itself.
    pub object_size: usize,
    /// Imbalance degree of the expected workload:
    /// `0` spreads objects evenly across shards, `1` sizes every shard to
    /// hold the whole pool (any one consumer may drain it), `n > 1` sizes
    /// each shard to `total_objects / n`.
    pub asymmetry: u32,
    /// Allocation strategy hint, captured once at construction.
    pub alloc_hint: AllocHint,
    /// Shard count override; defaults to the number of logical CPUs.
    pub shards: Option<usize>,
    /// Collect per-shard hit/miss counters (slight overhead).
    pub enable_stats: bool,
}

impl PoolConfig {
    /// Creates a configuration with the default balanced layout.
    pub fn new(total_objects: u32, object_size: usize) -> Self {
        Self {
            total_objects,
            object_size,
            asymmetry: 0,
            alloc_hint: AllocHint::AllowReclaim,
            shards: None,
            enable_stats: false,
        }
    }

    /// Sets the imbalance degree (see [`PoolConfig::asymmetry`]).
    pub fn with_asymmetry(mut self, asymmetry: u32) -> Self {
        self.asymmetry = asymmetry;
        self
    }

    /// Sets the allocation hint.
    pub fn with_alloc_hint(mut self, hint: AllocHint) -> Self {
        self.alloc_hint = hint;
        self
    }

    /// Overrides the shard count (mostly useful in tests; production pools
    /// want one shard per logical CPU).
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Enables per-shard hit/miss counters.
    pub fn with_stats(mut self, enable: bool) -> Self {
        self.enable_stats = enable;
        self
    }
}

/// Derives the per-shard ring capacity.
///
/// The raw estimate follows the asymmetry regime, is clamped to
/// [`MIN_SHARD_CAPACITY`], rounded up to a power of two, then doubled until
/// the shards together can hold every object. Callers validate
/// `shards > 0` and `total ≤ MAX_TOTAL_OBJECTS` first.
pub(crate) fn per_shard_capacity(total: u32, shards: usize, asymmetry: u32) -> u32 {
    let mut nents = match asymmetry {
        0 => total / shards as u32,
        1 => total,
        asym => total / asym,
    };
    if nents < MIN_SHARD_CAPACITY {
        nents = MIN_SHARD_CAPACITY;
    }
    let mut nents = nents.next_power_of_two();
    while u64::from(nents) * (shards as u64) < u64::from(total) {
        nents <<= 1;
    }
    nents
}
