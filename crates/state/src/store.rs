//! Reducer-driven state containers

use crate::action::Action;
use crate::domain::Domain;
use crate::event::{DispatchEvent, Origin};
use canopy_core::scheduler::{next_notify_key, schedule, NotifyKey};
use canopy_core::{Emitter, Equality, StructuralEq, Subscription};
use canopy_utils::tracing::dispatch_span;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Pure state transition. Returning the input `Rc` means "unchanged".
pub type Reducer<S> = Box<dyn Fn(&Rc<S>, &Action) -> Rc<S>>;

/// Everything needed to create a store under a domain
pub struct StoreConfig<S> {
    pub(crate) name: String,
    initial: Rc<S>,
    reducer: Reducer<S>,
    equality: Equality<S>,
}

impl<S: 'static> StoreConfig<S> {
    /// A store compared with the `strict` strategy
    pub fn new(
        name: impl Into<String>,
        initial: S,
        reducer: impl Fn(&Rc<S>, &Action) -> Rc<S> + 'static,
    ) -> Self
    where
        S: StructuralEq,
    {
        Self::with_equality(name, initial, reducer, Equality::strict())
    }

    /// A store for state without a [`StructuralEq`] impl, compared by pointer identity
    pub fn opaque(
        name: impl Into<String>,
        initial: S,
        reducer: impl Fn(&Rc<S>, &Action) -> Rc<S> + 'static,
    ) -> Self {
        Self::with_equality(name, initial, reducer, Equality::identity())
    }

    pub fn with_equality(
        name: impl Into<String>,
        initial: S,
        reducer: impl Fn(&Rc<S>, &Action) -> Rc<S> + 'static,
        equality: impl Into<Equality<S>>,
    ) -> Self {
        Self {
            name: name.into(),
            initial: Rc::new(initial),
            reducer: Box::new(reducer),
            equality: equality.into(),
        }
    }

    /// Replace the comparator
    pub fn equality(mut self, equality: impl Into<Equality<S>>) -> Self {
        self.equality = equality.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Type-erased view of a store, handed to plugins and used for broadcasts
pub trait StoreNode {
    fn name(&self) -> &str;

    fn path(&self) -> &str;

    /// Current state, for callers that know the concrete type
    fn state_any(&self) -> Rc<dyn Any>;

    /// Run `listener` whenever the store's change notification fires
    fn watch(&self, listener: Rc<dyn Fn()>) -> Subscription;

    /// Run `listener` for every action dispatched directly to the store
    fn watch_dispatch(&self, listener: Rc<dyn Fn(&DispatchEvent)>) -> Subscription;
}

/// Stores as seen by their owning domain's broadcast
pub(crate) trait StoreMember: StoreNode {
    fn receive_broadcast(&self, action: &Rc<Action>);
}

struct StoreInner<S> {
    name: String,
    path: String,
    state: RefCell<Rc<S>>,
    reducer: Reducer<S>,
    equality: Equality<S>,
    changes: Emitter<Rc<S>>,
    dispatches: Emitter<DispatchEvent>,
    key: NotifyKey,
    domain: Domain,
}

/// A state container owned by a domain
///
/// Clones are handles to the same store.
pub struct Store<S> {
    inner: Rc<StoreInner<S>>,
}

impl<S: 'static> Store<S> {
    pub(crate) fn new(domain: Domain, name: String, config: StoreConfig<S>) -> Self {
        let path = format!("{}.{}", domain.path(), name);
        Self {
            inner: Rc::new(StoreInner {
                name,
                path,
                state: RefCell::new(config.initial),
                reducer: config.reducer,
                equality: config.equality,
                changes: Emitter::new(),
                dispatches: Emitter::new(),
                key: next_notify_key(),
                domain,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Dotted path from the root domain
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// The domain that owns this store
    pub fn domain(&self) -> &Domain {
        &self.inner.domain
    }

    /// Result of the most recent completed reducer call
    pub fn get_state(&self) -> Rc<S> {
        self.inner.state.borrow().clone()
    }

    /// Reduce `action` and notify listeners if the state changed.
    ///
    /// `on_dispatch` listeners run before the reducer. Afterwards the event
    /// bubbles to the owning domain and its ancestors.
    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = Rc::new(action.into());
        let _span = self
            .inner
            .domain
            .traces_dispatch()
            .then(|| dispatch_span(&self.inner.path, &action.kind).entered());
        trace!(store = %self.inner.path, action = %action.kind, "dispatch");

        let event = DispatchEvent::new(action.clone(), self.inner.path.clone(), Origin::Store);
        self.inner.dispatches.emit(&event);
        self.apply(&action);
        self.inner.domain.bubble(&event);
    }

    /// Run a thunk with access to this store. Its return value, future or not, is passed through.
    pub fn dispatch_thunk<R>(&self, thunk: impl FnOnce(StoreThunk<S>) -> R) -> R {
        thunk(StoreThunk {
            store: self.clone(),
        })
    }

    /// Listen for state changes. Listeners receive the current state.
    pub fn on_change(&self, listener: impl Fn(&Rc<S>) + 'static) -> Subscription {
        self.inner.changes.on(listener)
    }

    /// Listen for actions dispatched directly to this store
    pub fn on_dispatch(&self, listener: impl Fn(&DispatchEvent) + 'static) -> Subscription {
        self.inner.dispatches.on(listener)
    }

    /// Whether anything listens for changes
    pub fn is_observed(&self) -> bool {
        self.inner.changes.listener_count() > 0
    }

    fn apply(&self, action: &Action) {
        let previous = self.get_state();
        let next = (self.inner.reducer)(&previous, action);
        *self.inner.state.borrow_mut() = next.clone();

        if !self.inner.equality.equals(&next, &previous) {
            self.schedule_change();
        }
    }

    fn schedule_change(&self) {
        let weak = Rc::downgrade(&self.inner);
        schedule(
            self.inner.key,
            Rc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let state = inner.state.borrow().clone();
                    trace!(store = %inner.path, "change notified");
                    inner.changes.emit(&state);
                }
            }),
        );
    }
}

impl<S: 'static> StoreNode for Store<S> {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn path(&self) -> &str {
        &self.inner.path
    }

    fn state_any(&self) -> Rc<dyn Any> {
        self.get_state()
    }

    fn watch(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.inner.changes.on(move |_| listener())
    }

    fn watch_dispatch(&self, listener: Rc<dyn Fn(&DispatchEvent)>) -> Subscription {
        self.inner.dispatches.on(move |event| listener(event))
    }
}

impl<S: 'static> StoreMember for Store<S> {
    fn receive_broadcast(&self, action: &Rc<Action>) {
        self.apply(action);
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.inner.path)
            .field("state", &self.inner.state.borrow())
            .field("equality", &self.inner.equality)
            .finish()
    }
}

/// What a store thunk can do
pub struct StoreThunk<S> {
    store: Store<S>,
}

impl<S: 'static> StoreThunk<S> {
    pub fn dispatch(&self, action: impl Into<Action>) {
        self.store.dispatch(action);
    }

    pub fn get_state(&self) -> Rc<S> {
        self.store.get_state()
    }

    pub fn domain(&self) -> &Domain {
        self.store.domain()
    }
}

impl<S> Clone for StoreThunk<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}
