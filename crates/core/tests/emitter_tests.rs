//! Integration tests for the emitter primitive

use canopy_core::{Emitter, Subscription};
use std::cell::RefCell;
use std::rc::Rc;

fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Rc<dyn Fn(&i32)>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let make = move |tag: &str| -> Rc<dyn Fn(&i32)> {
        let sink = sink.clone();
        let tag = tag.to_string();
        Rc::new(move |value: &i32| sink.borrow_mut().push(format!("{tag}:{value}")))
    };
    (log, make)
}

#[test]
fn settle_then_on_delivers_synchronously() {
    canopy_utils::tracing::init_for_tests();
    let emitter: Emitter<i32> = Emitter::new();
    emitter.settle(42);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let subscription = emitter.on(move |value: &i32| sink.borrow_mut().push(*value));

    assert_eq!(*seen.borrow(), vec![42]);
    assert!(!subscription.is_active());
    subscription.unsubscribe();
}

#[test]
fn settle_is_permanent() {
    let (log, make) = recorder();
    let emitter: Emitter<i32> = Emitter::new();
    let first = make("a");
    emitter.on(move |v| first(v));

    emitter.settle(1);
    emitter.settle(2);
    emitter.emit(&3);
    emitter.clear();

    assert_eq!(*log.borrow(), vec!["a:1"]);
    assert!(emitter.is_settled());
    assert_eq!(emitter.listener_count(), 0);
}

#[test]
fn emit_order_and_lifo_order() {
    let (log, make) = recorder();
    let emitter: Emitter<i32> = Emitter::new();
    for tag in ["a", "b", "c"] {
        let listener = make(tag);
        emitter.on(move |v| listener(v));
    }

    emitter.emit(&1);
    emitter.emit_lifo(&2);

    assert_eq!(
        *log.borrow(),
        vec!["a:1", "b:1", "c:1", "c:2", "b:2", "a:2"]
    );
}

#[test]
fn listeners_added_during_emit_wait_for_the_next_pass() {
    let emitter: Emitter<i32> = Emitter::new();
    let calls = Rc::new(RefCell::new(Vec::new()));

    let inner_emitter = emitter.clone();
    let sink = calls.clone();
    emitter.on(move |value| {
        sink.borrow_mut().push(format!("outer:{value}"));
        let sink = sink.clone();
        inner_emitter.on(move |value| sink.borrow_mut().push(format!("late:{value}")));
    });

    emitter.emit(&1);
    assert_eq!(*calls.borrow(), vec!["outer:1"]);

    emitter.emit(&2);
    assert_eq!(*calls.borrow(), vec!["outer:1", "outer:2", "late:2"]);
}

#[test]
fn emit_and_clear_detaches_before_invoking() {
    let emitter: Emitter<i32> = Emitter::new();
    let calls = Rc::new(RefCell::new(0));

    let again = emitter.clone();
    let count = calls.clone();
    emitter.on(move |_| {
        *count.borrow_mut() += 1;
        again.emit(&0);
    });

    emitter.emit_and_clear(&1);
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(emitter.listener_count(), 0);
}

#[test]
fn subscription_all_cancels_every_handle() {
    let emitter: Emitter<i32> = Emitter::new();
    let subs: Vec<Subscription> = (0..3).map(|_| emitter.on(|_| {})).collect();
    assert_eq!(emitter.listener_count(), 3);

    let combined = Subscription::all(subs);
    combined.unsubscribe();
    combined.unsubscribe();
    assert_eq!(emitter.listener_count(), 0);
}

#[test]
fn on_map_filters_payloads() {
    let emitter: Emitter<i32> = Emitter::new();
    let evens = Rc::new(RefCell::new(Vec::new()));
    let sink = evens.clone();
    emitter.on_map(
        |value| (value % 2 == 0).then(|| value.to_string()),
        move |text: &String| sink.borrow_mut().push(text.clone()),
    );

    for value in 1..=4 {
        emitter.emit(&value);
    }
    assert_eq!(*evens.borrow(), vec!["2", "4"]);
}
