//! End-to-end scenarios across domains, stores, batches and derived stores

mod common;

use canopy_core::Emitter;
use canopy_state::{batch, Action, DispatchEvent, Origin};
use common::{count_changes, counter, root};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn batched_domain_dispatches_notify_once() {
    let d = root();
    let a = counter(&d, "a");
    let b = counter(&d, "b");
    let a_changes = count_changes(&a);
    let b_changes = count_changes(&b);

    batch(|| {
        d.dispatch("INC");
        d.dispatch("INC");
    });

    assert_eq!(*a.get_state(), 2);
    assert_eq!(*b.get_state(), 2);
    assert_eq!(a_changes.get(), 1);
    assert_eq!(b_changes.get(), 1);
}

#[test]
fn unobserved_sum_computes_once_on_first_read() {
    let d = root();
    let a = counter(&d, "a");
    let b = counter(&d, "b");
    let runs = Rc::new(Cell::new(0));
    let counter_runs = runs.clone();
    let sum = d
        .derived("sum", (a.clone(), b.clone()), move |(a, b)| {
            counter_runs.set(counter_runs.get() + 1);
            *a + *b
        })
        .unwrap();

    a.dispatch("INC");
    a.dispatch("INC");
    assert_eq!(runs.get(), 0);

    assert_eq!(*sum.get_state(), 2);
    assert_eq!(runs.get(), 1);
}

#[test]
fn settled_emitter_replays_to_late_listeners() {
    let emitter: Emitter<i32> = Emitter::new();
    let results = Rc::new(RefCell::new(Vec::new()));

    emitter.settle(42);
    let sink = results.clone();
    emitter.on(move |value| sink.borrow_mut().push(*value));

    assert_eq!(*results.borrow(), vec![42]);
}

#[test]
fn batches_flush_even_when_dispatch_panics() {
    let d = root();
    let a = counter(&d, "a");
    d.store(canopy_state::StoreConfig::new("fragile", 0, |state: &Rc<i32>, action: &Action| {
        if action.is("BREAK") {
            panic!("fragile reducer");
        }
        state.clone()
    }))
    .unwrap();
    let changes = count_changes(&a);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        batch(|| {
            a.dispatch("INC");
            d.dispatch("BREAK");
        })
    }));

    assert!(result.is_err());
    assert_eq!(*a.get_state(), 1);
    assert_eq!(changes.get(), 1);
}

#[test]
fn observed_derived_follows_batched_sources() {
    let d = root();
    let a = counter(&d, "a");
    let b = counter(&d, "b");
    let runs = Rc::new(Cell::new(0));
    let counter_runs = runs.clone();
    let sum = d
        .derived("sum", (a.clone(), b.clone()), move |(a, b)| {
            counter_runs.set(counter_runs.get() + 1);
            *a + *b
        })
        .unwrap();
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    sum.on_change(move |value| sink.borrow_mut().push(**value));

    batch(|| {
        d.dispatch("INC");
        d.dispatch("INC");
    });

    // Both sources already hold 2 when the first flushed notification runs.
    assert_eq!(runs.get(), 2);
    assert_eq!(*emitted.borrow(), vec![4]);
}

#[test]
fn devtools_style_log_sees_every_dispatch_in_order() {
    let d = root();
    let ui = d.domain("ui").unwrap();
    let a = counter(&d, "a");
    let modal = counter(&ui, "modal");
    let log: Rc<RefCell<Vec<(String, Origin)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    d.on_any_dispatch(move |event: &DispatchEvent| {
        sink.borrow_mut()
            .push((format!("{}@{}", event.action.kind, event.source), event.origin))
    });

    a.dispatch("INC");
    ui.dispatch("INC");
    modal.dispatch("CLOSE");

    assert_eq!(
        *log.borrow(),
        vec![
            ("INC@app.a".to_string(), Origin::Store),
            ("INC@app.ui".to_string(), Origin::Domain),
            ("CLOSE@app.ui.modal".to_string(), Origin::Store),
        ]
    );
    assert_eq!(*a.get_state(), 1);
    assert_eq!(*modal.get_state(), 1);
}
