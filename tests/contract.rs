//! Contract tests for the observable
//!
//! Each test walks one documented behaviour through the public API only.

use observable::{
    subscriber, DuplicatePolicy, EventBus, NotifyError, Observable, ObservableConfig, Subscriber,
};
use std::sync::{Arc, Mutex};
use std::thread;

type Log = Arc<Mutex<Vec<String>>>;

fn tagged(log: &Log, tag: &'static str) -> Subscriber<i32> {
    let sink = Arc::clone(log);
    subscriber(move |v: &i32| sink.lock().unwrap().push(format!("{tag}:{v}")))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ==========================================
// Documented Scenarios
// ==========================================

#[test]
fn two_subscribers_receive_in_order() {
    let observable = Observable::new();
    let log = Log::default();
    observable.subscribe_shared(tagged(&log, "A"));
    observable.subscribe_shared(tagged(&log, "B"));

    observable.notify(&1);

    assert_eq!(entries(&log), vec!["A:1", "B:1"]);
}

#[test]
fn unsubscribed_callback_is_skipped() {
    let observable = Observable::new();
    let log = Log::default();
    let f = observable.subscribe_shared(tagged(&log, "f"));
    observable.subscribe_shared(tagged(&log, "g"));

    observable.unsubscribe(f);
    observable.notify(&2);

    assert_eq!(entries(&log), vec!["g:2"]);
}

#[test]
fn notify_with_no_subscribers_is_silent() {
    let observable: Observable<i32> = Observable::new();
    observable.notify(&0);
    assert!(observable.notify_isolated(&0).is_ok());
}

#[test]
fn subscribe_then_unsubscribe_means_no_delivery() {
    let observable = Observable::new();
    let log = Log::default();
    let id = observable.subscribe_shared(tagged(&log, "f"));
    observable.unsubscribe(id);

    observable.notify(&9);

    assert!(entries(&log).is_empty());
}

// Tokens stand in for function-reference equality: each registration gets its
// own token, so removal never depends on comparing closures.
#[test]
fn double_unsubscribe_matches_single() {
    let once = Observable::new();
    let twice = Observable::new();
    let log = Log::default();

    let a = once.subscribe_shared(tagged(&log, "a"));
    once.subscribe_shared(tagged(&log, "keep"));
    let b = twice.subscribe_shared(tagged(&log, "a"));
    twice.subscribe_shared(tagged(&log, "keep"));

    assert!(once.unsubscribe(a));
    assert!(twice.unsubscribe(b));
    assert!(!twice.unsubscribe(b));

    assert_eq!(once.len(), twice.len());
    assert_eq!(once.subscriptions().len(), 1);
}

#[test]
fn unknown_token_leaves_sequence_untouched() {
    let other: Observable<i32> = Observable::new();
    other.subscribe(|_| {});
    let stranger = other.subscribe(|_| {});

    let observable: Observable<i32> = Observable::new();
    let first = observable.subscribe(|_| {});

    // Tokens are only meaningful on the observable that issued them
    assert!(!observable.unsubscribe(stranger));
    assert_eq!(observable.subscriptions(), vec![first]);
}

// ==========================================
// Duplicate Policy
// ==========================================

#[test]
fn duplicate_handle_fires_per_registration() {
    let observable = Observable::new();
    let log = Log::default();
    let f = tagged(&log, "f");

    let first = observable.subscribe_shared(Arc::clone(&f));
    let second = observable.subscribe_shared(Arc::clone(&f));
    assert_ne!(first, second);

    observable.notify(&1);
    assert_eq!(entries(&log), vec!["f:1", "f:1"]);

    // One token, one occurrence
    observable.unsubscribe(first);
    observable.notify(&2);
    assert_eq!(entries(&log), vec!["f:1", "f:1", "f:2"]);
}

#[test]
fn handle_removal_drops_every_occurrence() {
    let observable = Observable::new();
    let log = Log::default();
    let f = tagged(&log, "f");
    observable.subscribe_shared(Arc::clone(&f));
    observable.subscribe_shared(Arc::clone(&f));

    assert_eq!(observable.unsubscribe_callback(&f), 2);
    observable.notify(&1);

    assert!(entries(&log).is_empty());
    assert!(observable.is_empty());
}

#[test]
fn reject_policy_keeps_single_entry() {
    let observable =
        Observable::with_config(ObservableConfig::default().with_duplicates(DuplicatePolicy::Reject));
    let log = Log::default();
    let f = tagged(&log, "f");

    observable.subscribe_shared(Arc::clone(&f));
    observable.subscribe_shared(Arc::clone(&f));
    observable.notify(&4);

    assert_eq!(entries(&log), vec!["f:4"]);
}

// ==========================================
// Failure Handling
// ==========================================

#[test]
fn isolated_notify_collects_every_failure() {
    let observable = Observable::new();
    let log = Log::default();
    observable.subscribe(|_: &i32| panic!("first"));
    observable.subscribe_shared(tagged(&log, "ok"));
    observable.subscribe(|v: &i32| panic!("second saw {v}"));

    let err = observable.notify_isolated(&3).unwrap_err();

    assert_eq!(entries(&log), vec!["ok:3"]);
    let NotifyError::SubscribersFailed { attempted, failures } = err;
    assert_eq!(attempted, 3);
    let messages: Vec<_> = failures.iter().map(|f| f.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second saw 3"]);
}

#[test]
fn fail_fast_stops_at_panicking_subscriber() {
    let observable = Observable::new();
    let log = Log::default();
    observable.subscribe_shared(tagged(&log, "before"));
    observable.subscribe(|_: &i32| panic!("stop"));
    observable.subscribe_shared(tagged(&log, "after"));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observable.notify(&1)));

    assert!(result.is_err());
    assert_eq!(entries(&log), vec!["before:1"]);
}

// ==========================================
// Threads and the Async Bridge
// ==========================================

#[test]
fn concurrent_notify_and_subscribe() {
    let observable = Arc::new(Observable::new());
    let counter = Arc::new(Mutex::new(0usize));

    let sink = Arc::clone(&counter);
    observable.subscribe(move |_: &usize| *sink.lock().unwrap() += 1);

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let observable = Arc::clone(&observable);
            thread::spawn(move || {
                for i in 0..100 {
                    observable.notify(&i);
                    let id = observable.subscribe(|_| {});
                    observable.unsubscribe(id);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(*counter.lock().unwrap(), 400);
    assert_eq!(observable.len(), 1);
    assert_eq!(observable.stats().notifications, 400);
}

#[tokio::test]
async fn bus_sees_notifications_after_sync_subscribers() {
    let observable = Observable::new();
    let log = Log::default();
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    observable.subscribe_shared(tagged(&log, "sync"));
    bus.attach(&observable);
    observable.notify(&8);

    assert_eq!(entries(&log), vec!["sync:8"]);
    assert_eq!(rx.recv().await.unwrap().payload, 8);
}
