//! objpool - a scalable lock-free per-CPU object pool.
//!
//! A fixed-capacity multi-producer/multi-consumer reservoir of
//! pre-allocated fixed-size objects, built for hot paths that must hand out
//! and reclaim a small record on every event — tracing hooks, instrument
//! probes, interrupt-like contexts — where a general-purpose allocator is
//! off the table and a single shared freelist turns into a cache-line
//! brawl.
//!
//! The pool is sharded per logical CPU. Each shard is a bounded ring of
//! object pointers guarded by 32-bit epoch tags (the ABA defense), so
//! `acquire` and `release` stay lock-free, never block or allocate, and are
//! re-entrant from nested contexts. Operations start at the caller's home
//! shard and fall back across the others in a fixed forward walk.
//!
//! # Key properties
//!
//! - Per-CPU sharding keeps memory traffic on the local cache
//! - Epoch-tagged rings avoid ABA without tagged pointers or double-wide CAS
//! - Bounded work: one shard walk per operation, no spinning on stalled peers
//! - Three population modes: self-managed objects, a carved user buffer,
//!   individually scattered objects — torn down through one callback that
//!   visits every object exactly once
//!
//! # Example
//!
//! ```
//! use objpool_rs::{ObjectPool, PoolConfig};
//!
//! let pool = ObjectPool::new(PoolConfig::new(16, 64)).unwrap();
//!
//! let obj = pool.acquire().expect("freshly seeded pool");
//! // ... use the 64 zeroed-at-init bytes behind `obj` ...
//!
//! // SAFETY: `obj` came from this pool and is released exactly once.
//! unsafe { pool.release(obj).unwrap() };
//!
//! pool.finalize(|_obj, _kind| {
//!     // invoked once per object still in the pool
//! });
//! ```

mod arena;
mod config;
mod cpu;
mod drain;
mod error;
mod invariants;
mod pool;
mod populate;
mod slot;
mod stats;

pub use config::{AllocHint, PoolConfig};
pub use drain::DrainKind;
pub use error::PoolError;
pub use pool::ObjectPool;
pub use stats::PoolStats;
