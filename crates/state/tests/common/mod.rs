//! Shared fixtures for the canopy-state integration tests
#![allow(dead_code)]

use canopy_state::{Action, Domain, Store, StoreConfig};
use std::cell::Cell;
use std::rc::Rc;

/// A store starting at 0 that increments on `INC` and ignores everything else
pub fn counter(domain: &Domain, name: &str) -> Store<i32> {
    domain
        .store(StoreConfig::new(name, 0, |state: &Rc<i32>, action: &Action| {
            if action.is("INC") {
                Rc::new(**state + 1)
            } else {
                state.clone()
            }
        }))
        .expect("counter store")
}

/// Count how often a store's change listeners fire
pub fn count_changes<S: 'static>(store: &Store<S>) -> Rc<Cell<usize>> {
    let fired = Rc::new(Cell::new(0));
    let hits = fired.clone();
    store.on_change(move |_| hits.set(hits.get() + 1));
    fired
}

pub fn root() -> Domain {
    canopy_utils::tracing::init_for_tests();
    Domain::root("app").expect("root domain")
}
