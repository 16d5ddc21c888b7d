use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use foundation_concurrent::map::CaseInsensitive;
use foundation_concurrent::{ConcurrencyConfig, ConcurrentMap};
use ntest::timeout;

#[test]
#[timeout(20000)]
fn disjoint_adds_from_many_threads_all_land() {
    let threads: i64 = 8;
    let per_thread: i64 = 500;
    let map = Arc::new(ConcurrentMap::with_options(4, 16).expect("valid"));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for k in 0..per_thread {
                    let key = t * per_thread + k;
                    assert!(map.try_add(key, -key));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let expected = usize::try_from(threads * per_thread).expect("fits");
    assert_eq!(map.len(), expected);
    assert_eq!(map.to_vec().len(), expected);
    assert_eq!(map.iter().count(), expected);
    assert!(map.iter().all(|(key, value)| key == -value));
}

#[test]
#[timeout(20000)]
fn racing_removers_split_the_entries() {
    let map = Arc::new(ConcurrentMap::new());
    for i in 0..2000 {
        map.insert(i, i);
    }

    let gate = Arc::new(Barrier::new(2));
    let removed = Arc::new(AtomicUsize::new(0));
    let removers: Vec<_> = (0..2)
        .map(|_| {
            let map = Arc::clone(&map);
            let gate = Arc::clone(&gate);
            let removed = Arc::clone(&removed);
            thread::spawn(move || {
                gate.wait();
                let mut mine = 0;
                for i in 0..2000 {
                    if map.try_remove(&i).is_some() {
                        mine += 1;
                    }
                }
                removed.fetch_add(mine, Ordering::SeqCst);
                mine
            })
        })
        .collect();

    let counts: Vec<usize> = removers.into_iter().map(|h| h.join().expect("join")).collect();
    assert_eq!(counts.iter().sum::<usize>(), 2000);
    assert_eq!(removed.load(Ordering::SeqCst), 2000);
    assert!(map.is_empty());
}

#[test]
fn case_insensitive_map_treats_spellings_as_one_key() {
    let map = ConcurrentMap::with_options_and_comparer(2, 8, CaseInsensitive::new()).expect("valid");
    map.insert("Content-Type".to_string(), 1);
    assert_eq!(map.insert("content-type".to_string(), 2), Some(1));
    assert_eq!(map.len(), 1);
    assert_eq!(map.try_remove(&"CONTENT-TYPE".to_string()), Some(2));
}

#[test]
fn configured_map_uses_requested_striping() {
    let config = ConcurrencyConfig::from_toml_str("[map]\nconcurrency_level = 2\ninitial_capacity = 4\n")
        .expect("parses");
    let map = ConcurrentMap::<u32, u32>::from_config(&config.map).expect("valid");
    for i in 0..100 {
        map.insert(i, i);
    }
    assert_eq!(map.len(), 100);
    assert!(format!("{map:?}").contains("segments: 2"));
}
