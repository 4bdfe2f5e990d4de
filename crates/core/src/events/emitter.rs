//! Event emitter for publishing payloads to ordered listeners

use crate::events::subscription::Subscription;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

type Listener<T> = Rc<dyn Fn(&T)>;

struct EmitterInner<T> {
    /// Registered listeners, in registration order
    listeners: IndexMap<u64, Listener<T>>,
    next_id: u64,
    /// Payload frozen by `settle`
    settled: Option<Rc<T>>,
}

/// Ordered, synchronous pub/sub primitive.
///
/// Every emission walks a snapshot of the listeners taken when it starts, so
/// listeners may subscribe, unsubscribe or emit again without affecting the
/// pass in flight. After [`Emitter::settle`] the emitter is frozen: new
/// listeners are called back immediately with the settled payload and every
/// other operation is a no-op.
///
/// Clones share the same listener set.
pub struct Emitter<T> {
    inner: Rc<RefCell<EmitterInner<T>>>,
}

impl<T: 'static> Emitter<T> {
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EmitterInner {
                listeners: IndexMap::new(),
                next_id: 0,
                settled: None,
            })),
        }
    }

    /// Register a listener
    pub fn on(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let settled = self.inner.borrow().settled.clone();
        if let Some(payload) = settled {
            listener(&payload);
            return Subscription::noop();
        }

        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, Rc::new(listener));
            id
        };

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.shift_remove(&id);
            }
        })
    }

    /// Register a listener behind a mapping function.
    ///
    /// `map` returning `None` filters the payload out for this listener.
    pub fn on_map<U: 'static>(
        &self,
        map: impl Fn(&T) -> Option<U> + 'static,
        listener: impl Fn(&U) + 'static,
    ) -> Subscription {
        self.on(move |payload| {
            if let Some(value) = map(payload) {
                listener(&value);
            }
        })
    }

    /// Invoke every listener in registration order
    pub fn emit(&self, payload: &T) {
        if let Some(listeners) = self.snapshot(false) {
            for listener in listeners {
                listener(payload);
            }
        }
    }

    /// Invoke every listener in reverse registration order
    pub fn emit_lifo(&self, payload: &T) {
        if let Some(listeners) = self.snapshot(false) {
            for listener in listeners.into_iter().rev() {
                listener(payload);
            }
        }
    }

    /// Drop every listener without notifying them
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.settled.is_none() {
            inner.listeners.clear();
        }
    }

    /// Detach the current listeners and invoke them once
    pub fn emit_and_clear(&self, payload: &T) {
        if let Some(listeners) = self.snapshot(true) {
            for listener in listeners {
                listener(payload);
            }
        }
    }

    /// Detach the current listeners and invoke them once, newest first
    pub fn emit_and_clear_lifo(&self, payload: &T) {
        if let Some(listeners) = self.snapshot(true) {
            for listener in listeners.into_iter().rev() {
                listener(payload);
            }
        }
    }

    /// Deliver a final payload and freeze the emitter
    pub fn settle(&self, payload: T) {
        let (listeners, payload) = {
            let mut inner = self.inner.borrow_mut();
            if inner.settled.is_some() {
                return;
            }
            let payload = Rc::new(payload);
            inner.settled = Some(payload.clone());
            let listeners: Vec<Listener<T>> = inner.listeners.drain(..).map(|(_, l)| l).collect();
            (listeners, payload)
        };

        trace!(listeners = listeners.len(), "emitter settled");
        for listener in listeners {
            listener(&payload);
        }
    }

    /// Whether `settle` has been called
    pub fn is_settled(&self) -> bool {
        self.inner.borrow().settled.is_some()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Copy the listener list, optionally detaching it. `None` once settled.
    fn snapshot(&self, detach: bool) -> Option<Vec<Listener<T>>> {
        let mut inner = self.inner.borrow_mut();
        if inner.settled.is_some() {
            return None;
        }
        let listeners = if detach {
            inner.listeners.drain(..).map(|(_, l)| l).collect()
        } else {
            inner.listeners.values().cloned().collect()
        };
        Some(listeners)
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Emitter")
            .field("listeners", &inner.listeners.len())
            .field("settled", &inner.settled.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&i32)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &str| -> Box<dyn Fn(&i32)> {
            let sink = sink.clone();
            let name = name.to_string();
            Box::new(move |v: &i32| sink.borrow_mut().push(format!("{name}:{v}")))
        };
        (log, make)
    }

    #[test]
    fn emits_in_registration_order() {
        let emitter = Emitter::new();
        let (log, make) = recorder();
        emitter.on(make("a"));
        emitter.on(make("b"));

        emitter.emit(&1);
        emitter.emit_lifo(&2);

        assert_eq!(*log.borrow(), vec!["a:1", "b:1", "b:2", "a:2"]);
    }

    #[test]
    fn unsubscribe_during_emit_does_not_affect_the_pass() {
        let emitter: Emitter<i32> = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let later: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let handle = later.clone();
        let sink = log.clone();
        emitter.on(move |v| {
            sink.borrow_mut().push(format!("first:{v}"));
            if let Some(sub) = handle.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        let sink = log.clone();
        let second = emitter.on(move |v| sink.borrow_mut().push(format!("second:{v}")));
        *later.borrow_mut() = Some(second);

        emitter.emit(&1);
        emitter.emit(&2);

        assert_eq!(*log.borrow(), vec!["first:1", "second:1", "first:2"]);
    }

    #[test]
    fn subscribe_during_emit_waits_for_next_pass() {
        let emitter: Emitter<i32> = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_emitter = emitter.clone();
        let sink = log.clone();
        emitter.on(move |v| {
            let sink = sink.clone();
            if *v == 1 {
                inner_emitter.on(move |v| sink.borrow_mut().push(*v));
            }
        });

        emitter.emit(&1);
        assert!(log.borrow().is_empty());
        emitter.emit(&2);
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn map_filters_payloads() {
        let emitter: Emitter<i32> = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        emitter.on_map(
            |v| (v % 2 == 0).then(|| v * 10),
            move |v| sink.borrow_mut().push(*v),
        );

        for v in 1..=4 {
            emitter.emit(&v);
        }
        assert_eq!(*log.borrow(), vec![20, 40]);
    }

    #[test]
    fn emit_and_clear_detaches_listeners() {
        let emitter = Emitter::new();
        let (log, make) = recorder();
        emitter.on(make("a"));
        emitter.on(make("b"));

        emitter.emit_and_clear_lifo(&7);
        emitter.emit(&8);

        assert_eq!(*log.borrow(), vec!["b:7", "a:7"]);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn clear_is_silent() {
        let emitter = Emitter::new();
        let (log, make) = recorder();
        emitter.on(make("a"));
        emitter.clear();
        emitter.emit(&1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn settle_freezes_the_emitter() {
        let emitter = Emitter::new();
        let (log, make) = recorder();
        emitter.on(make("early"));

        emitter.settle(42);
        assert!(emitter.is_settled());
        assert_eq!(emitter.listener_count(), 0);

        let late = emitter.on(make("late"));
        assert!(!late.is_active());

        emitter.emit(&1);
        emitter.emit_and_clear(&2);
        emitter.clear();
        emitter.settle(3);

        assert_eq!(*log.borrow(), vec!["early:42", "late:42"]);
    }
}
