// ==============================================
// CONCURRENT FRONT-END TESTS (integration)
// ==============================================
//
// Exercises ConcurrentCache under real threads: shard independence for
// writers, mixed reader/writer traffic, and count aggregation.

use std::sync::Arc;
use std::thread;

use shardcache::builder::{CacheBuilder, EvictionPolicy};

#[test]
fn parallel_setters_on_distinct_keys_all_land() {
    let cache = Arc::new(
        CacheBuilder::new(4096)
            .policy(EvictionPolicy::Lru)
            .shards(4)
            .build_concurrent::<u64, u64>()
            .unwrap(),
    );

    let mut handles = Vec::new();
    for worker in 0..4u64 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..256 {
                let key = worker * 1000 + i;
                cache.set(key, key).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.count(), 4 * 256);
    for worker in 0..4u64 {
        for i in 0..256 {
            let key = worker * 1000 + i;
            assert_eq!(cache.get(&key), Some(key));
        }
    }
}

#[test]
fn mixed_readers_and_writers_stay_consistent() {
    for policy in [
        EvictionPolicy::Fifo,
        EvictionPolicy::Sieve,
        EvictionPolicy::S3Fifo,
        EvictionPolicy::TinyLfu,
    ] {
        let cache = Arc::new(
            CacheBuilder::new(512)
                .policy(policy)
                .shards(8)
                .build_concurrent::<u64, u64>()
                .unwrap(),
        );

        for key in 0..128 {
            cache.set(key, key * 3).unwrap();
        }

        let mut handles = Vec::new();
        for worker in 0..4u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for round in 0..200u64 {
                    let key = (worker * 7 + round * 13) % 256;
                    match round % 4 {
                        0 => {
                            cache.set(key, key * 3).unwrap();
                        }
                        1 => {
                            if let Some(value) = cache.get(&key) {
                                assert_eq!(value, key * 3);
                            }
                        }
                        2 => {
                            let _ = cache.contains(&key);
                        }
                        _ => {
                            let _ = cache.remove(&key);
                        }
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every surviving entry still carries its own value.
        for key in 0..256 {
            if let Some(value) = cache.get(&key) {
                assert_eq!(value, key * 3, "{:?}", policy);
            }
        }
    }
}

#[test]
fn count_sums_shard_lengths_under_shared_locks() {
    let cache = Arc::new(
        CacheBuilder::new(1024)
            .shards(4)
            .build_concurrent::<u64, u64>()
            .unwrap(),
    );

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for key in 0..500 {
                cache.set(key, key).unwrap();
            }
        })
    };
    let counter = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            // Counts taken mid-write are monotone-bounded, never junk.
            for _ in 0..100 {
                let count = cache.count();
                assert!(count <= 500);
            }
        })
    };

    writer.join().unwrap();
    counter.join().unwrap();
    assert_eq!(cache.count(), 500);
}

#[test]
fn ttl_expiry_is_visible_across_threads() {
    let cache = Arc::new(
        CacheBuilder::new(64)
            .policy(EvictionPolicy::Sieve)
            .shards(2)
            .build_concurrent::<u64, &'static str>()
            .unwrap(),
    );

    cache.set_with_ttl(1, "short", 20).unwrap();
    cache.set(2, "stays").unwrap();

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(40));
            assert_eq!(cache.get(&1), None);
            assert_eq!(cache.get(&2), Some("stays"));
        })
    };
    reader.join().unwrap();
}

#[test]
fn clear_under_contention_leaves_empty_cache() {
    let cache = Arc::new(
        CacheBuilder::new(256)
            .shards(4)
            .build_concurrent::<u64, u64>()
            .unwrap(),
    );

    let mut handles = Vec::new();
    for worker in 0..2u64 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                cache.set(worker * 500 + i, i).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    cache.clear();
    assert_eq!(cache.count(), 0);
    assert_eq!(cache.get(&0), None);
}
