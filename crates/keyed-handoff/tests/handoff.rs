//! Producer/consumer behaviour of `HandoffMap` across real threads.

use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use keyed_handoff::{HandoffError, HandoffMap, MapConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn new_map() -> Arc<HandoffMap<u32, String>> {
    init_tracing();
    Arc::new(HandoffMap::with_config(
        MapConfig::default().with_label("test"),
    ))
}

/// Time given to spawned consumers to reach their wait.
const SETTLE: Duration = Duration::from_millis(100);

#[test]
fn second_put_is_ignored_while_first_is_pending() {
    let map = new_map();
    assert_eq!(map.put(1, "one".into()), Ok(None));
    assert_eq!(map.put(1, "uno".into()), Ok(Some("one".into())));
    assert_eq!(map.get(&1), Ok(Some("one".into())));
    assert_eq!(map.offer(1, "eins".into()), Ok(Some("one".into())));
    assert_eq!(
        map.offer_timeout(1, "un".into(), Duration::from_secs(1)),
        Ok(Some("one".into()))
    );
}

#[test]
fn put_then_take_round_trips() {
    let map = new_map();
    map.put(1, "one".into()).unwrap();
    assert_eq!(map.take(&1), Ok(Some("one".into())));
    assert_eq!(map.is_key_available(&1), Ok(false));
    assert_eq!(map.get(&1), Ok(None));

    // The key is free again for a new value.
    assert_eq!(map.put(1, "again".into()), Ok(None));
    assert_eq!(map.take(&1), Ok(Some("again".into())));
}

#[test]
fn take_blocks_until_put() {
    let map = new_map();
    let delay = Duration::from_millis(150);

    let start = Instant::now();
    let consumer = {
        let map = map.clone();
        thread::spawn(move || {
            let value = map.take(&1);
            (value, start.elapsed())
        })
    };

    thread::sleep(delay);
    map.put(1, "one".into()).unwrap();

    let (value, elapsed) = consumer.join().unwrap();
    assert_eq!(value, Ok(Some("one".into())));
    assert!(elapsed >= delay, "returned after {:?}", elapsed);
}

#[test]
fn exactly_one_of_two_waiters_gets_the_value() {
    let map = new_map();
    let barrier = Arc::new(Barrier::new(3));

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let map = map.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                map.take_timeout(&1, Duration::from_secs(5))
            })
        })
        .collect();

    barrier.wait();
    thread::sleep(SETTLE);
    map.put(1, "one".into()).unwrap();

    let results: Vec<_> = consumers
        .into_iter()
        .map(|consumer| consumer.join().unwrap())
        .collect();
    let winners = results
        .iter()
        .filter(|result| **result == Ok(Some("one".to_string())))
        .count();
    let losers = results.iter().filter(|result| **result == Ok(None)).count();
    assert_eq!((winners, losers), (1, 1), "results: {:?}", results);
}

#[test]
fn independent_keys_are_delivered_independently() {
    let map = new_map();
    let delay = Duration::from_millis(100);

    let consumers: Vec<_> = [1u32, 2]
        .into_iter()
        .map(|key| {
            let map = map.clone();
            thread::spawn(move || map.take(&key))
        })
        .collect();
    let producers: Vec<_> = [(2u32, "two"), (1, "one")]
        .into_iter()
        .map(|(key, value)| {
            let map = map.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                map.put(key, value.to_string())
            })
        })
        .collect();

    for producer in producers {
        assert_eq!(producer.join().unwrap(), Ok(None));
    }
    let values: Vec<_> = consumers
        .into_iter()
        .map(|consumer| consumer.join().unwrap())
        .collect();
    assert_eq!(
        values,
        vec![Ok(Some("one".to_string())), Ok(Some("two".to_string()))]
    );
}

#[test]
fn clear_cancels_blocked_take() {
    let map = new_map();
    let consumer = {
        let map = map.clone();
        thread::spawn(move || {
            let result = map.take(&404);
            (result, Instant::now())
        })
    };

    thread::sleep(SETTLE);
    let cleared_at = Instant::now();
    map.clear().unwrap();

    let (result, released_at) = consumer.join().unwrap();
    assert_eq!(result, Err(HandoffError::Cancelled));
    assert!(released_at.duration_since(cleared_at) < Duration::from_secs(1));
}

#[test]
fn clear_spares_delivered_values_and_cancels_the_rest() {
    let map = new_map();

    let served = {
        let map = map.clone();
        thread::spawn(move || map.take(&1))
    };
    let starved = {
        let map = map.clone();
        thread::spawn(move || map.take(&2))
    };

    thread::sleep(SETTLE);
    map.put(1, "one".into()).unwrap();
    assert_eq!(served.join().unwrap(), Ok(Some("one".into())));

    map.clear().unwrap();
    assert_eq!(starved.join().unwrap(), Err(HandoffError::Cancelled));
}

#[test]
fn timed_take_returns_none_after_timeout() {
    let map = new_map();
    let timeout = Duration::from_secs(1);

    let start = Instant::now();
    assert_eq!(map.take_timeout(&1, timeout), Ok(None));
    let elapsed = start.elapsed();

    assert!(elapsed >= timeout, "returned early: {:?}", elapsed);
    assert!(elapsed <= timeout * 11 / 10, "returned late: {:?}", elapsed);
}

#[test]
fn zero_timeout_remove_only_takes_available_values() {
    let map = new_map();
    assert_eq!(map.remove(&1), Ok(None));
    assert_eq!(map.take_timeout(&1, Duration::ZERO), Ok(None));

    map.put(1, "one".into()).unwrap();
    assert_eq!(map.remove(&1), Ok(Some("one".into())));
    assert_eq!(map.remove(&1), Ok(None));
}

#[test]
fn every_operation_fails_after_clear() {
    let map = new_map();
    map.put(1, "one".into()).unwrap();
    map.clear().unwrap();

    assert_eq!(map.put(1, "one".into()), Err(HandoffError::NotActive));
    assert_eq!(map.offer(1, "one".into()), Err(HandoffError::NotActive));
    assert_eq!(map.take(&1), Err(HandoffError::NotActive));
    assert_eq!(
        map.take_timeout(&1, Duration::from_millis(10)),
        Err(HandoffError::NotActive)
    );
    assert_eq!(map.remove(&1), Err(HandoffError::NotActive));
    assert_eq!(map.get(&1), Err(HandoffError::NotActive));
    assert_eq!(map.is_key_available(&1), Err(HandoffError::NotActive));
    assert_eq!(map.contains_key(&1), Err(HandoffError::NotActive));
    assert_eq!(
        map.contains_value(&"one".to_string()),
        Err(HandoffError::NotActive)
    );
    assert_eq!(map.len(), Err(HandoffError::NotActive));
    assert_eq!(map.is_empty(), Err(HandoffError::NotActive));
    assert_eq!(map.clear(), Err(HandoffError::NotActive));
}

#[test]
fn concurrent_clears_shut_down_once() {
    let map = new_map();
    let barrier = Arc::new(Barrier::new(4));

    let clearers: Vec<_> = (0..4)
        .map(|_| {
            let map = map.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                map.clear()
            })
        })
        .collect();

    let results: Vec<_> = clearers
        .into_iter()
        .map(|clearer| clearer.join().unwrap())
        .collect();
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(map.is_closed());
}

#[test]
fn size_counts_only_available_keys() {
    let map = new_map();
    assert_eq!(map.len(), Ok(0));
    assert_eq!(map.is_empty(), Ok(true));

    let waiter = {
        let map = map.clone();
        thread::spawn(move || map.take_timeout(&99, Duration::from_millis(500)))
    };
    thread::sleep(SETTLE);
    assert_eq!(map.len(), Ok(0));
    assert_eq!(map.is_empty(), Ok(true));
    assert_eq!(map.contains_key(&99), Ok(false));

    for key in 0..3 {
        map.put(key, format!("v{}", key)).unwrap();
    }
    assert_eq!(map.len(), Ok(3));
    assert_eq!(map.is_empty(), Ok(false));
    assert_eq!(map.contains_key(&2), Ok(true));
    assert_eq!(map.contains_value(&"v1".to_string()), Ok(true));
    assert_eq!(map.contains_value(&"v9".to_string()), Ok(false));

    map.take(&0).unwrap();
    assert_eq!(map.len(), Ok(2));

    assert_eq!(waiter.join().unwrap(), Ok(None));
    assert_eq!(map.len(), Ok(2));
}

#[test]
fn many_producers_and_consumers_match_reference() {
    const KEYS: u32 = 100;

    let map = new_map();
    let reference: HashMap<u32, String> =
        (0..KEYS).map(|key| (key, format!("value {}", key))).collect();
    let reference = Arc::new(reference);

    let consumers: Vec<_> = (0..KEYS)
        .map(|key| {
            let map = map.clone();
            thread::spawn(move || (key, map.take_timeout(&key, Duration::from_secs(10))))
        })
        .collect();
    let producers: Vec<_> = (0..KEYS)
        .map(|key| {
            let map = map.clone();
            let reference = reference.clone();
            thread::spawn(move || map.put(key, reference[&key].clone()))
        })
        .collect();

    for producer in producers {
        assert_eq!(producer.join().unwrap(), Ok(None));
    }
    for consumer in consumers {
        let (key, value) = consumer.join().unwrap();
        assert_eq!(value, Ok(Some(reference[&key].clone())), "key {}", key);
    }
    assert_eq!(map.is_empty(), Ok(true));
    map.clear().unwrap();
}
