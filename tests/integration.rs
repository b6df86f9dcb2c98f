use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier,
};
use std::thread;

use rand::Rng;

use pinmap::{ForwardSameThenBackward, PinMap};

/// Counts how often a value is actually dropped, i.e. how often the map
/// physically reclaims an entry.
struct DropCount(Arc<AtomicUsize>);

impl Drop for DropCount {
    #[inline]
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn pinned_entry_survives_concurrent_erase() {
    let drops = Arc::new(AtomicUsize::new(0));
    let map = Arc::new(PinMap::<i32, DropCount>::new());
    for key in 1..=3 {
        map.insert(key, DropCount(Arc::clone(&drops)));
    }

    let barrier1 = Arc::new(Barrier::new(2));
    let barrier2 = Arc::new(Barrier::new(2));

    let holder = {
        let map = Arc::clone(&map);
        let drops = Arc::clone(&drops);
        let barrier1 = Arc::clone(&barrier1);
        let barrier2 = Arc::clone(&barrier2);
        thread::spawn(move || {
            let it = map.find(&2);
            barrier1.wait();
            // the eraser has logically removed the entry by now
            barrier2.wait();

            assert!(it.read().is_some(), "pinned entry must stay dereferencable");
            assert_eq!(it.retired(), Some(true));
            assert_eq!(drops.load(Ordering::Relaxed), 0, "no reclamation while pinned");
            drop(it);
        })
    };

    barrier1.wait();
    assert_eq!(map.erase(&2), 1);
    assert_eq!(map.len(), 2);
    assert!(map.get(&2).is_none());
    barrier2.wait();

    holder.join().unwrap();

    // the holder released the last pin, which performed the deferred reclaim
    assert_eq!(drops.load(Ordering::Relaxed), 1);
    assert_eq!(map.physical_len(), 2);
}

#[test]
fn reclamation_waits_for_every_pin() {
    let drops = Arc::new(AtomicUsize::new(0));
    let map = Arc::new(PinMap::<i32, DropCount>::new());
    for key in 0..3 {
        map.insert(key, DropCount(Arc::clone(&drops)));
    }

    let pinned = Arc::new(Barrier::new(3));
    let erased = Arc::new(Barrier::new(3));

    let holders: Vec<_> = (0..2)
        .map(|key| {
            let map = Arc::clone(&map);
            let pinned = Arc::clone(&pinned);
            let erased = Arc::clone(&erased);
            thread::spawn(move || {
                let it = map.find(&key);
                pinned.wait();
                erased.wait();
                // both pinned entries must still be there
                assert!(it.read().is_some());
            })
        })
        .collect();

    pinned.wait();
    for key in 0..3 {
        map.erase(&key);
    }
    // entry 2 had no pins and went down physically right away
    assert_eq!(drops.load(Ordering::Relaxed), 1);
    erased.wait();

    for holder in holders {
        holder.join().unwrap();
    }
    assert_eq!(drops.load(Ordering::Relaxed), 3);
    assert_eq!(map.physical_len(), 0);
}

#[test]
fn scans_meet_concurrent_erasure_gracefully() {
    let map = Arc::new(PinMap::<i32, i32, ForwardSameThenBackward>::new());
    for key in 0..128 {
        map.insert(key, key);
    }

    let start = Arc::new(Barrier::new(3));

    let scanner = {
        let map = Arc::clone(&map);
        let start = Arc::clone(&start);
        thread::spawn(move || {
            start.wait();
            let mut it = map.begin();
            let mut visited = 0;
            for _ in 0..512 {
                if it.is_end() {
                    break;
                }
                visited += 1;
                it.advance();
            }
            visited
        })
    };

    let eraser = {
        let map = Arc::clone(&map);
        let start = Arc::clone(&start);
        thread::spawn(move || {
            start.wait();
            for key in (0..128).step_by(2) {
                map.erase(&key);
            }
        })
    };

    start.wait();
    for key in (1..128).step_by(2) {
        map.erase_fast(&key);
    }

    scanner.join().unwrap();
    eraser.join().unwrap();

    assert_eq!(map.len(), 0);
    map.cleanup();
    assert_eq!(map.physical_len(), 0);
}

#[test]
fn randomized_contention_preserves_invariants() {
    const THREADS: usize = 4;
    const OPS: usize = 2_000;
    const KEYSPACE: i32 = 64;

    let map = Arc::new(PinMap::<i32, i32>::new());
    let start = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let map = Arc::clone(&map);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                let mut it = map.end();
                start.wait();
                for _ in 0..OPS {
                    let key = rng.gen_range(0..KEYSPACE);
                    match rng.gen_range(0..100) {
                        0..=29 => {
                            map.insert(key, key);
                        }
                        30..=49 => {
                            map.erase(&key);
                        }
                        50..=59 => {
                            map.erase_fast(&key);
                        }
                        60..=79 => {
                            it = map.find(&key);
                        }
                        80..=89 => {
                            it.advance();
                        }
                        90..=94 => {
                            if let Some(mut value) = map.get_mut(&key) {
                                *value += 1;
                            }
                        }
                        _ => {
                            map.cleanup();
                        }
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    // with every iterator gone, a cleanup pass must leave live entries only
    let live = map.len();
    map.cleanup();
    assert_eq!(map.physical_len(), live);
    assert_eq!(map.to_btree().len(), live);
}

#[test]
fn iterators_keep_the_substrate_alive_across_threads() {
    let map = PinMap::<i32, String>::new();
    map.insert(1, String::from("payload"));
    let it = map.find(&1);
    drop(map);

    let it = thread::spawn(move || {
        assert_eq!(it.read().as_deref().map(String::as_str), Some("payload"));
        it
    })
    .join()
    .unwrap();

    drop(it);
}
