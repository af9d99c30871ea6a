//! End-to-end scenarios for the sharded object pool: seeding, population
//! modes, churn under real threads, and teardown accounting.

use crossbeam_utils::Backoff;
use objpool_rs::{AllocHint, DrainKind, ObjectPool, PoolConfig, PoolError};
use std::collections::HashSet;
use std::ptr::NonNull;
use std::sync::Arc;
use std::thread;

/// Release that tolerates the transient all-shards-full window a concurrent
/// walk can observe when the rings are provisioned exactly to the total.
fn release_retrying(pool: &ObjectPool, obj: NonNull<u8>) {
    // SAFETY: forwarded caller contract; the object is handed back once.
    while unsafe { pool.release(obj) }.is_err() {
        std::hint::spin_loop();
    }
}

#[test]
fn single_thread_sanity() {
    let pool = ObjectPool::new(PoolConfig::new(4, 16).with_shards(2)).unwrap();

    let mut held = Vec::new();
    for _ in 0..4 {
        held.push(pool.acquire().expect("seeded object"));
    }
    let distinct: HashSet<_> = held.iter().copied().collect();
    assert_eq!(distinct.len(), 4);

    // The fifth acquire finds every shard empty.
    assert!(pool.acquire().is_none());

    for obj in held.drain(..) {
        unsafe { pool.release(obj).unwrap() };
    }
    for _ in 0..4 {
        held.push(pool.acquire().expect("returned object"));
    }
    assert_eq!(held.len(), 4);
}

#[test]
fn conservation_under_churn() {
    const THREADS: usize = 8;
    const PAIRS: usize = 100_000;

    let pool = Arc::new(
        ObjectPool::new(PoolConfig::new(64, 32).with_shards(THREADS)).unwrap(),
    );

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut done = 0;
                while done < PAIRS {
                    if let Some(obj) = pool.acquire() {
                        release_retrying(&pool, obj);
                        done += 1;
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let pool = Arc::into_inner(pool).unwrap();
    assert_eq!(pool.available(), 64);

    let mut drained = HashSet::new();
    pool.finalize(|obj, kind| {
        assert_eq!(kind, DrainKind::Pooled);
        assert!(drained.insert(obj), "object reported twice");
    });
    assert_eq!(drained.len(), 64);
}

#[test]
fn bulk_churn_with_oversubscription() {
    const THREADS: usize = 4;
    const BULK: usize = 4;
    const ROUNDS: usize = 20_000;

    // 8 objects for 4 threads wanting 4 each: misses are expected and must
    // not lose or duplicate anything.
    let pool = Arc::new(
        ObjectPool::new(PoolConfig::new(8, 16).with_shards(THREADS).with_stats(true)).unwrap(),
    );

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut grabbed = Vec::with_capacity(BULK);
                for _ in 0..ROUNDS {
                    for _ in 0..BULK {
                        if let Some(obj) = pool.acquire() {
                            grabbed.push(obj);
                        }
                    }
                    for obj in grabbed.drain(..) {
                        release_retrying(&pool, obj);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = pool.stats();
    assert!(stats.acquire_hits > 0);
    assert_eq!(
        stats.acquire_hits, stats.releases,
        "every hit was paired with a release"
    );

    let pool = Arc::into_inner(pool).unwrap();
    let mut drained = 0;
    pool.finalize(|_, _| drained += 1);
    assert_eq!(drained, 8);
}

#[test]
fn user_buffer_path() {
    let mut pool = ObjectPool::new(PoolConfig::new(64, 0).with_shards(4)).unwrap();

    let mut buffer = vec![0u64; 128]; // 1024 pointer-aligned bytes
    let base = NonNull::new(buffer.as_mut_ptr().cast::<u8>()).unwrap();
    let range = base.as_ptr() as usize..base.as_ptr() as usize + 1024;

    let added = unsafe { pool.populate(base, 1024, 32) }.unwrap();
    assert_eq!(added, 32);
    assert_eq!(pool.available(), 32);

    // Acquired objects point into the caller's buffer.
    let obj = pool.acquire().unwrap();
    assert!(range.contains(&(obj.as_ptr() as usize)));
    unsafe { pool.release(obj).unwrap() };

    let mut elements = 0;
    let mut wrappers = 0;
    pool.finalize(|obj, kind| match kind {
        DrainKind::BufferElement => {
            assert!(range.contains(&(obj.as_ptr() as usize)));
            elements += 1;
        }
        DrainKind::UserBuffer => {
            assert_eq!(obj, base);
            assert_eq!(elements, 32, "wrapper reported after all elements");
            wrappers += 1;
        }
        other => panic!("unexpected drain kind {other:?}"),
    });
    assert_eq!(elements, 32);
    assert_eq!(wrappers, 1);
}

#[test]
fn scattered_foreign_objects_round_trip() {
    let mut pool = ObjectPool::new(PoolConfig::new(64, 0).with_shards(4)).unwrap();

    let mut storage = vec![0u64; 100];
    for i in 0..64 {
        let obj = NonNull::new(std::ptr::addr_of_mut!(storage[i]).cast::<u8>()).unwrap();
        unsafe { pool.scatter_add(obj) }.unwrap();
    }
    // 4 shards x capacity 16 are now exactly full.
    let extra = NonNull::new(std::ptr::addr_of_mut!(storage[64]).cast::<u8>()).unwrap();
    assert_eq!(unsafe { pool.scatter_add(extra) }, Err(PoolError::Full));

    let mut foreign = 0;
    pool.finalize(|_, kind| {
        assert_eq!(kind, DrainKind::Foreign);
        foreign += 1;
    });
    assert_eq!(foreign, 64);
}

#[test]
fn nested_acquire_from_a_finalize_callback() {
    let live = ObjectPool::new(PoolConfig::new(2, 16).with_shards(2)).unwrap();
    let doomed = ObjectPool::new(PoolConfig::new(2, 16).with_shards(2)).unwrap();

    let mut drained = 0;
    doomed.finalize(|_, _| {
        // Operating on a different pool from inside the callback is fine.
        let obj = live.acquire().expect("the live pool is untouched");
        unsafe { live.release(obj).unwrap() };
        drained += 1;
    });
    assert_eq!(drained, 2);
    assert_eq!(live.available(), 2);
}

#[test]
fn double_release_reports_full() {
    // 2 shards x capacity 4 hold exactly the 8 pool objects, so an extra
    // pointer has nowhere to go.
    let pool = ObjectPool::new(PoolConfig::new(8, 16).with_shards(2)).unwrap();

    let obj = pool.acquire().unwrap();
    unsafe { pool.release(obj).unwrap() };
    assert_eq!(unsafe { pool.release(obj) }, Err(PoolError::Full));
}

#[test]
fn alloc_hints_only_change_the_backing() {
    for hint in [AllocHint::AllowReclaim, AllocHint::NoReclaim] {
        // Large enough that the reclaim-friendly path spans whole pages.
        let pool = ObjectPool::new(
            PoolConfig::new(256, 512)
                .with_shards(2)
                .with_alloc_hint(hint),
        )
        .unwrap();
        assert_eq!(pool.available(), 256);

        let obj = pool.acquire().unwrap();
        // Objects are zeroed at init.
        assert_eq!(unsafe { *obj.as_ptr() }, 0);
        unsafe { pool.release(obj).unwrap() };

        let mut drained = 0;
        pool.finalize(|_, _| drained += 1);
        assert_eq!(drained, 256);
    }
}

#[test]
fn empty_pool_retry_with_backoff() {
    let pool = ObjectPool::new(PoolConfig::new(1, 16).with_shards(4)).unwrap();

    let only = pool.acquire().unwrap();
    let backoff = Backoff::new();
    while !backoff.is_completed() {
        assert!(pool.acquire().is_none());
        backoff.snooze();
    }

    unsafe { pool.release(only).unwrap() };
    assert!(pool.acquire().is_some());
}

#[test]
fn stats_track_hits_and_misses() {
    let pool = ObjectPool::new(PoolConfig::new(2, 16).with_shards(2).with_stats(true)).unwrap();

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    assert!(pool.acquire().is_none());

    unsafe {
        pool.release(a).unwrap();
        pool.release(b).unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.acquire_hits, 2);
    assert_eq!(stats.acquire_misses, 1);
    assert_eq!(stats.releases, 2);
}
