//! Read-only stores computed from other stores
//!
//! A [`DerivedStore`] caches `selector(dependencies)` and keeps the cache in
//! step with its sources in one of two ways:
//!
//! - **unobserved** (no `on_change` listeners): a source change just drops
//!   the cache; the selector runs again on the next `get_state`.
//! - **observed**: a source change recomputes right away, and listeners are
//!   told only when the new value differs from the cached one.
//!
//! Dependencies are fixed at construction. Cycles between derived stores are
//! not detected.

use crate::store::Store;
use canopy_core::{Emitter, Equality, Subscription};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// A source a derived store can read from and watch
pub trait Readable: Clone + 'static {
    type Value: 'static;

    fn read(&self) -> Rc<Self::Value>;

    /// Call `listener` after every change notification
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

impl<S: 'static> Readable for Store<S> {
    type Value = S;

    fn read(&self) -> Rc<S> {
        self.get_state()
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.on_change(move |_| listener())
    }
}

impl<T: 'static> Readable for DerivedStore<T> {
    type Value = T;

    fn read(&self) -> Rc<T> {
        self.get_state()
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.on_change(move |_| listener())
    }
}

/// An ordered, fixed list of sources
///
/// Implemented for tuples of up to six [`Readable`]s (selectors receive a
/// tuple of their values) and for `Vec<R>` (selectors receive a `Vec`).
pub trait Dependencies: 'static {
    type Values;

    fn read_all(&self) -> Self::Values;

    fn subscribe_all(&self, listener: Rc<dyn Fn()>) -> Vec<Subscription>;
}

macro_rules! tuple_dependencies {
    ($(($($name:ident : $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: Readable),+> Dependencies for ($($name,)+) {
                type Values = ($(Rc<$name::Value>,)+);

                fn read_all(&self) -> Self::Values {
                    ($(self.$idx.read(),)+)
                }

                fn subscribe_all(&self, listener: Rc<dyn Fn()>) -> Vec<Subscription> {
                    vec![$(self.$idx.subscribe(listener.clone())),+]
                }
            }
        )*
    };
}

tuple_dependencies!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
    (A: 0, B: 1, C: 2, D: 3, E: 4),
    (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5),
);

impl<R: Readable> Dependencies for Vec<R> {
    type Values = Vec<Rc<R::Value>>;

    fn read_all(&self) -> Self::Values {
        self.iter().map(Readable::read).collect()
    }

    fn subscribe_all(&self, listener: Rc<dyn Fn()>) -> Vec<Subscription> {
        self.iter()
            .map(|source| source.subscribe(listener.clone()))
            .collect()
    }
}

struct DerivedInner<T> {
    name: String,
    path: String,
    /// `None` means dirty
    cache: RefCell<Option<Rc<T>>>,
    compute: Box<dyn Fn() -> T>,
    equality: Equality<T>,
    changes: Emitter<Rc<T>>,
    sources: RefCell<Vec<Subscription>>,
}

impl<T: 'static> DerivedInner<T> {
    fn source_changed(&self) {
        if self.changes.listener_count() == 0 {
            self.cache.borrow_mut().take();
            trace!(derived = %self.path, "marked dirty");
            return;
        }

        let next = Rc::new((self.compute)());
        let previous = self.cache.replace(Some(next.clone()));
        let changed = previous.map_or(true, |previous| !self.equality.equals(&next, &previous));
        if changed {
            trace!(derived = %self.path, "recomputed value changed");
            self.changes.emit(&next);
        }
    }
}

impl<T> Drop for DerivedInner<T> {
    fn drop(&mut self) {
        for subscription in self.sources.get_mut().drain(..) {
            subscription.unsubscribe();
        }
    }
}

/// A read-only store whose value is a function of other stores
///
/// Clones share the cache and listeners.
pub struct DerivedStore<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T: 'static> DerivedStore<T> {
    pub(crate) fn new<D, F>(
        name: String,
        path: String,
        dependencies: D,
        selector: F,
        equality: Equality<T>,
    ) -> Self
    where
        D: Dependencies,
        F: Fn(D::Values) -> T + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<DerivedInner<T>>| {
            let weak = weak.clone();
            let listener: Rc<dyn Fn()> = Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.source_changed();
                }
            });
            let sources = dependencies.subscribe_all(listener);

            DerivedInner {
                name,
                path,
                cache: RefCell::new(None),
                compute: Box::new(move || selector(dependencies.read_all())),
                equality,
                changes: Emitter::new(),
                sources: RefCell::new(sources),
            }
        });

        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `${domain path}.${name}`
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// The cached value, computing it first if the cache is dirty
    pub fn get_state(&self) -> Rc<T> {
        let cached = self.inner.cache.borrow().clone();
        if let Some(value) = cached {
            return value;
        }

        trace!(derived = %self.inner.path, "computing");
        let value = Rc::new((self.inner.compute)());
        *self.inner.cache.borrow_mut() = Some(value.clone());
        value
    }

    /// Listen for value changes. While any listener is attached the store recomputes eagerly.
    pub fn on_change(&self, listener: impl Fn(&Rc<T>) + 'static) -> Subscription {
        self.inner.changes.on(listener)
    }

    pub fn is_observed(&self) -> bool {
        self.inner.changes.listener_count() > 0
    }

    /// Whether the next `get_state` will run the selector
    pub fn is_dirty(&self) -> bool {
        self.inner.cache.borrow().is_none()
    }
}

impl<T> Clone for DerivedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DerivedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedStore")
            .field("path", &self.inner.path)
            .field("cache", &self.inner.cache.borrow())
            .field("equality", &self.inner.equality)
            .finish()
    }
}
