//! A randomized multi-thread workout for the map.
//!
//! Several thread roles hammer one shared map at once: seekers only look
//! things up and walk iterators, changers insert and overwrite, erasers
//! remove entries both physically and via deferred retirement. Run it under
//! different optimisation levels (and under a race detector if available);
//! thread handoff timing changes which interleavings actually occur.

use std::sync::{Arc, Barrier};
use std::thread;

use rand::Rng;

use pinmap::{ForwardSameThenBackward, PinMap};

type Map = PinMap<i32, i32, ForwardSameThenBackward>;

const SEEKERS: usize = 2;
const CHANGERS: usize = 2;
const ERASERS: usize = 2;
const ROUNDS: usize = 10_000;
const KEYSPACE: i32 = 1_000;

fn seeker(map: Arc<Map>) {
    let mut rng = rand::thread_rng();
    let mut it = map.end();
    for _ in 0..ROUNDS {
        let key = rng.gen_range(0..KEYSPACE);
        match rng.gen_range(0..100) {
            0..=19 => {
                if let Ok(value) = map.at(&key) {
                    assert_eq!(*value % KEYSPACE, key % KEYSPACE);
                }
            }
            20..=39 => {
                it = map.find(&key);
            }
            40..=59 => {
                it = map.lower_bound(&key);
            }
            60..=79 => {
                it = map.upper_bound(&key);
            }
            _ => {
                it.advance();
                if let Some(value) = it.read() {
                    assert!(*value >= 0);
                }
            }
        }
    }
}

fn changer(map: Arc<Map>) {
    let mut rng = rand::thread_rng();
    for _ in 0..ROUNDS {
        let key = rng.gen_range(0..KEYSPACE);
        match rng.gen_range(0..100) {
            0..=49 => {
                map.insert(key, key);
            }
            50..=79 => {
                if let Some(mut value) = map.get_mut(&key) {
                    *value += KEYSPACE;
                }
            }
            _ => {
                let (it, _) = map.insert(key, key);
                // erase through the iterator we just obtained
                let succ = map.erase_at(it);
                drop(succ);
            }
        }
    }
}

fn eraser(map: Arc<Map>) {
    let mut rng = rand::thread_rng();
    for _ in 0..ROUNDS {
        let key = rng.gen_range(0..KEYSPACE);
        match rng.gen_range(0..100) {
            0..=49 => {
                map.erase(&key);
            }
            50..=79 => {
                map.erase_fast(&key);
            }
            80..=89 => {
                let first = map.lower_bound(&key);
                let last = map.lower_bound(&(key + 8));
                map.erase_range(&first, &last);
            }
            _ => {
                map.cleanup();
            }
        }
    }
}

fn main() {
    let map = Arc::new(Map::new());
    for key in 0..KEYSPACE / 2 {
        map.insert(key, key);
    }

    let start = Arc::new(Barrier::new(SEEKERS + CHANGERS + ERASERS));
    let mut handles = Vec::new();

    for _ in 0..SEEKERS {
        let map = Arc::clone(&map);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            seeker(map);
        }));
    }
    for _ in 0..CHANGERS {
        let map = Arc::clone(&map);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            changer(map);
        }));
    }
    for _ in 0..ERASERS {
        let map = Arc::clone(&map);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            eraser(map);
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let live = map.len();
    let physical = map.physical_len();
    assert!(physical >= live);

    // no iterators remain, so one cleanup pass must shed every tombstone
    map.cleanup();
    assert_eq!(map.physical_len(), map.len());
    assert_eq!(map.to_btree().len(), live);

    println!(
        "stress finished: {} live entries, {} tombstones reclaimed",
        live,
        physical - live
    );
}
