use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use foundation_concurrent::blocking::{
    self, BlockingCollection, ConcurrentStack, TryTakeResult,
};
use foundation_concurrent::errors::InvalidOperation;
use foundation_concurrent::WaitTimeout;
use ntest::timeout;
use serial_test::serial;

#[test]
fn default_ordering_is_first_in_first_out() {
    let collection = BlockingCollection::<u32>::new();
    for i in 0..100 {
        collection.add(i).expect("add");
    }
    collection.complete_adding().expect("complete");

    let drained: Vec<u32> = collection.consuming_iter().expect("iter").collect();
    assert_eq!(drained, (0..100).collect::<Vec<_>>());
}

#[test]
#[timeout(20000)]
fn count_never_exceeds_the_bound() {
    let collection = Arc::new(BlockingCollection::<usize>::bounded(5).expect("valid"));
    let done = Arc::new(AtomicBool::new(false));

    let watcher = {
        let collection = Arc::clone(&collection);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut highest = 0;
            while !done.load(Ordering::SeqCst) {
                highest = highest.max(collection.count().expect("open"));
            }
            highest
        })
    };

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let collection = Arc::clone(&collection);
            thread::spawn(move || {
                for i in 0..250 {
                    collection.add(p * 1000 + i).expect("add");
                }
            })
        })
        .collect();

    let mut taken = 0;
    while taken < 1000 {
        collection.take().expect("item");
        taken += 1;
    }
    for producer in producers {
        producer.join().expect("producer");
    }
    done.store(true, Ordering::SeqCst);

    assert!(watcher.join().expect("watcher") <= 5);
    assert_eq!(collection.count(), Ok(0));
}

#[test]
fn completion_freezes_the_count_until_taken() {
    let collection = BlockingCollection::<u8>::bounded(10).expect("valid");
    for i in 0..7 {
        collection.add(i).expect("add");
    }
    collection.complete_adding().expect("complete");

    for _ in 0..3 {
        assert!(collection.add(1).is_err());
        assert_eq!(collection.count(), Ok(7));
    }
    assert_eq!(collection.is_completed(), Ok(false));

    assert_eq!(collection.take(), Ok(0));
    assert_eq!(collection.count(), Ok(6));
}

#[test]
fn disposal_fails_the_whole_surface() {
    let collection = BlockingCollection::<u8, _>::with_container(ConcurrentStack::new());
    collection.add(1).expect("add");
    collection.dispose();

    let failures = [
        collection.add(2).err(),
        collection.try_add_millis(2, 0).err(),
        collection.take().err(),
        collection.try_take_millis(0).err(),
        collection.complete_adding().err(),
        collection.count().err(),
        collection.bounded_capacity().err(),
        collection.is_completed().err(),
        collection.is_adding_completed().err(),
        collection.to_vec().err(),
        collection.snapshot_iter().err(),
        collection.consuming_iter().err(),
    ];
    for failure in failures {
        assert!(failure.expect("disposed member fails").is_disposed());
    }

    assert!(collection.sync_root().expect_err("unsupported").is_not_supported());
    assert!(collection.is_synchronized().expect_err("unsupported").is_not_supported());
}

#[test]
#[serial]
#[timeout(20000)]
fn blocked_consumers_all_receive_then_completion_succeeds() {
    let collection = Arc::new(BlockingCollection::<usize>::new());

    let consumers: Vec<_> = (0..8)
        .map(|_| {
            let collection = Arc::clone(&collection);
            thread::spawn(move || collection.take())
        })
        .collect();

    thread::sleep(Duration::from_millis(50));

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let collection = Arc::clone(&collection);
            thread::spawn(move || collection.add(p))
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer").expect("add");
    }

    let mut received: Vec<usize> = consumers
        .into_iter()
        .map(|c| c.join().expect("consumer").expect("item"))
        .collect();
    received.sort_unstable();
    assert_eq!(received, (0..8).collect::<Vec<_>>());

    collection.complete_adding().expect("complete");
    assert_eq!(collection.is_completed(), Ok(true));
}

#[test]
#[timeout(20000)]
fn take_from_any_drains_every_collection() {
    let collections: Arc<Vec<BlockingCollection<usize>>> =
        Arc::new((0..5).map(|_| BlockingCollection::bounded(3).expect("valid")).collect());

    let producer = {
        let collections = Arc::clone(&collections);
        thread::spawn(move || {
            let members: Vec<_> = collections.iter().collect();
            for i in 0..200 {
                blocking::add_to_any(&members, i).expect("room eventually");
            }
            for collection in collections.iter() {
                collection.complete_adding().expect("complete");
            }
        })
    };

    let members: Vec<_> = collections.iter().collect();
    let mut received = Vec::new();
    loop {
        match blocking::try_take_from_any(&members, WaitTimeout::Infinite).expect("open") {
            TryTakeResult::Taken((index, item)) => {
                assert!(index < members.len());
                received.push(item);
            }
            TryTakeResult::Drained => break,
            TryTakeResult::TimedOut => unreachable!("infinite wait"),
        }
    }
    producer.join().expect("producer");

    received.sort_unstable();
    assert_eq!(received, (0..200).collect::<Vec<_>>());
    assert_eq!(
        blocking::take_from_any(&members).expect_err("drained").invalid_operation(),
        Some(InvalidOperation::AllCollectionsCompleted)
    );
}

#[test]
#[timeout(10000)]
fn disposing_a_member_wakes_blocked_take_from_any() {
    let collections: Arc<Vec<BlockingCollection<u8>>> =
        Arc::new((0..3).map(|_| BlockingCollection::new()).collect());

    let taker = {
        let collections = Arc::clone(&collections);
        thread::spawn(move || {
            let members: Vec<_> = collections.iter().collect();
            blocking::take_from_any(&members)
        })
    };

    thread::sleep(Duration::from_millis(30));
    collections[1].dispose();

    assert!(taker.join().expect("join").expect_err("disposed").is_disposed());
}

#[test]
#[serial]
#[timeout(10000)]
fn completion_fails_a_blocked_producer_but_keeps_queued_items() {
    let collection = Arc::new(BlockingCollection::<u32>::bounded(1).expect("valid"));
    collection.add(1).expect("fill the only slot");

    let producer = {
        let collection = Arc::clone(&collection);
        thread::spawn(move || collection.add(2))
    };

    thread::sleep(Duration::from_millis(50));
    collection.complete_adding().expect("complete");

    let err = producer.join().expect("join").expect_err("blocked add fails");
    assert_eq!(err.invalid_operation(), Some(InvalidOperation::AddingCompleted));

    assert_eq!(collection.take(), Ok(1));
    assert_eq!(collection.is_completed(), Ok(true));
    assert_eq!(collection.try_take(WaitTimeout::ZERO), Ok(TryTakeResult::Drained));
}

#[test]
#[serial]
#[timeout(20000)]
fn racing_completion_freezes_the_count_at_successful_adds() {
    for _ in 0..20 {
        let collection = Arc::new(BlockingCollection::<usize>::new());

        let producers: Vec<_> = (0..4)
            .map(|producer| {
                let collection = Arc::clone(&collection);
                thread::spawn(move || {
                    (0..200)
                        .filter(|i| collection.add(producer * 1000 + i).is_ok())
                        .count()
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(1));
        collection.complete_adding().expect("complete");

        let added: usize = producers
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .sum();

        let frozen = collection.count().expect("open");
        assert_eq!(frozen, added);

        thread::sleep(Duration::from_millis(10));
        assert_eq!(collection.count(), Ok(frozen));
        assert!(collection.try_add(0, WaitTimeout::ZERO).is_err());
    }
}
