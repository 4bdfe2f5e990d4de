//! Hierarchical routing of actions
//!
//! A [`Domain`] owns stores and subdomains. Dispatching an action on a
//! domain broadcasts it *down* to every store it owns, then to every
//! subdomain, recursively. Nothing is broadcast upwards: instead the
//! [`DispatchEvent`] bubbles up through `on_any_dispatch` on each ancestor,
//! which gives one subscription point for a whole subtree.
//!
//! All domains of a tree share the root's [`Resolver`] and [`RuntimeConfig`].

use crate::action::Action;
use crate::config::RuntimeConfig;
use crate::derived::{Dependencies, DerivedStore};
use crate::event::{DispatchEvent, Origin};
use crate::plugin::{applicable, NodeKind, NodeOptions, Plugin};
use crate::resolver::{ModuleDefinition, OverrideHandle, Resolver};
use crate::store::{Store, StoreConfig, StoreMember};
use canopy_core::{batch_with, Emitter, Equality, Error, Result, StructuralEq, Subscription};
use canopy_utils::tracing::dispatch_span;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Something a domain broadcast reaches
pub(crate) enum Member {
    Store(Rc<dyn StoreMember>),
    Domain(Domain),
}

impl Member {
    fn receive_broadcast(&self, action: &Rc<Action>) {
        match self {
            Member::Store(store) => store.receive_broadcast(action),
            Member::Domain(domain) => domain.receive_broadcast(action),
        }
    }
}

struct DomainInner {
    name: String,
    path: String,
    parent: Option<Domain>,
    /// `None` on the root itself
    root: Option<Domain>,
    resolver: Rc<Resolver>,
    config: Rc<RuntimeConfig>,
    stores: RefCell<Vec<Rc<dyn StoreMember>>>,
    subdomains: RefCell<Vec<Domain>>,
    /// Names of every store, subdomain and derived store created here
    names: RefCell<HashSet<String>>,
    plugins: RefCell<Vec<Rc<dyn Plugin>>>,
    dispatches: Emitter<DispatchEvent>,
    any_dispatches: Emitter<DispatchEvent>,
}

/// A node in the domain tree
///
/// Clones are handles to the same domain. Domains live as long as any handle
/// into their tree; there is no teardown.
#[derive(Clone)]
pub struct Domain {
    inner: Rc<DomainInner>,
}

impl Domain {
    /// Create a root domain with default settings
    pub fn root(name: impl Into<String>) -> Result<Domain> {
        Self::root_with(RuntimeConfig {
            root_name: name.into(),
            ..RuntimeConfig::default()
        })
    }

    /// Create a root domain with its own resolver
    pub fn root_with(config: RuntimeConfig) -> Result<Domain> {
        validate_name("", &config.root_name)?;
        debug!(
            domain = %config.root_name,
            batch_mode = %config.batch_mode,
            source = ?config.source,
            "root domain created"
        );

        Ok(Domain {
            inner: Rc::new(DomainInner {
                name: config.root_name.clone(),
                path: config.root_name.clone(),
                parent: None,
                root: None,
                resolver: Rc::new(Resolver::new()),
                config: Rc::new(config),
                stores: RefCell::new(Vec::new()),
                subdomains: RefCell::new(Vec::new()),
                names: RefCell::new(HashSet::new()),
                plugins: RefCell::new(Vec::new()),
                dispatches: Emitter::new(),
                any_dispatches: Emitter::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Dotted path from the root
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn parent(&self) -> Option<&Domain> {
        self.inner.parent.as_ref()
    }

    /// The root of this domain's tree
    pub fn root_domain(&self) -> Domain {
        self.inner.root.clone().unwrap_or_else(|| self.clone())
    }

    pub fn is_root(&self) -> bool {
        self.inner.root.is_none()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Create a store at `${path}.${name}`
    pub fn store<S: 'static>(&self, config: StoreConfig<S>) -> Result<Store<S>> {
        let plugins = self.plugins_for(NodeKind::Store, &config.name);
        let mut options = NodeOptions::new(config.name.clone());
        for plugin in &plugins {
            plugin.pre_store(&mut options);
        }

        self.claim_name(&options.name)?;
        let store = Store::new(self.clone(), options.name, config);
        self.inner
            .stores
            .borrow_mut()
            .push(Rc::new(store.clone()) as Rc<dyn StoreMember>);
        debug!(store = %store.path(), "store created");

        for plugin in &plugins {
            plugin.post_store(&store);
        }
        Ok(store)
    }

    /// Create a child domain sharing this tree's resolver and configuration.
    ///
    /// The child starts with a copy of this domain's current plugin list.
    pub fn domain(&self, name: impl Into<String>) -> Result<Domain> {
        let name = name.into();
        let plugins = self.plugins_for(NodeKind::Domain, &name);
        let mut options = NodeOptions::new(name);
        for plugin in &plugins {
            plugin.pre_domain(&mut options);
        }

        self.claim_name(&options.name)?;
        let child = Domain {
            inner: Rc::new(DomainInner {
                path: format!("{}.{}", self.inner.path, options.name),
                name: options.name,
                parent: Some(self.clone()),
                root: Some(self.root_domain()),
                resolver: self.inner.resolver.clone(),
                config: self.inner.config.clone(),
                stores: RefCell::new(Vec::new()),
                subdomains: RefCell::new(Vec::new()),
                names: RefCell::new(HashSet::new()),
                plugins: RefCell::new(self.inner.plugins.borrow().clone()),
                dispatches: Emitter::new(),
                any_dispatches: Emitter::new(),
            }),
        };
        self.inner.subdomains.borrow_mut().push(child.clone());
        debug!(domain = %child.path(), "domain created");

        for plugin in &plugins {
            plugin.post_domain(&child);
        }
        Ok(child)
    }

    /// A derived store compared with the `strict` strategy
    pub fn derived<D, T, F>(
        &self,
        name: impl Into<String>,
        dependencies: D,
        selector: F,
    ) -> Result<DerivedStore<T>>
    where
        D: Dependencies,
        T: StructuralEq + 'static,
        F: Fn(D::Values) -> T + 'static,
    {
        self.derived_with(name, dependencies, selector, Equality::strict())
    }

    /// A derived store at `${path}.${name}` with an explicit comparator
    pub fn derived_with<D, T, F>(
        &self,
        name: impl Into<String>,
        dependencies: D,
        selector: F,
        equality: impl Into<Equality<T>>,
    ) -> Result<DerivedStore<T>>
    where
        D: Dependencies,
        T: 'static,
        F: Fn(D::Values) -> T + 'static,
    {
        let name = name.into();
        self.claim_name(&name)?;
        let path = format!("{}.{}", self.inner.path, name);
        debug!(derived = %path, "derived store created");
        Ok(DerivedStore::new(
            name,
            path,
            dependencies,
            selector,
            equality.into(),
        ))
    }

    /// Broadcast `action` to the whole subtree, then bubble the event to the ancestors
    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = Rc::new(action.into());
        let _span = self
            .traces_dispatch()
            .then(|| dispatch_span(&self.inner.path, &action.kind).entered());
        trace!(domain = %self.inner.path, action = %action.kind, "dispatch");

        let event = DispatchEvent::new(action.clone(), self.inner.path.clone(), Origin::Domain);
        self.inner.dispatches.emit(&event);
        self.inner.any_dispatches.emit(&event);
        self.receive_broadcast(&action);
        if let Some(parent) = &self.inner.parent {
            parent.bubble(&event);
        }
    }

    /// Run a thunk with access to this domain. Its return value is passed through.
    pub fn dispatch_thunk<R>(&self, thunk: impl FnOnce(DomainThunk) -> R) -> R {
        thunk(DomainThunk {
            domain: self.clone(),
        })
    }

    /// Listen for actions dispatched on this domain
    pub fn on_dispatch(&self, listener: impl Fn(&DispatchEvent) + 'static) -> Subscription {
        self.inner.dispatches.on(listener)
    }

    /// Listen for actions dispatched on this domain or anywhere below it
    pub fn on_any_dispatch(&self, listener: impl Fn(&DispatchEvent) + 'static) -> Subscription {
        self.inner.any_dispatches.on(listener)
    }

    /// Resolve a module from the tree's shared resolver
    pub fn get<T: 'static>(&self, definition: &ModuleDefinition<T>) -> Result<Rc<T>> {
        let plugins = self.inner.plugins.borrow().clone();
        self.inner
            .resolver
            .get(&self.root_domain(), definition, &plugins)
    }

    /// Swap `source` for `replacement` before `source` is first requested
    pub fn override_module<T: 'static>(
        &self,
        source: &ModuleDefinition<T>,
        replacement: &ModuleDefinition<T>,
    ) -> Result<OverrideHandle> {
        self.inner.resolver.override_module(source, replacement)
    }

    /// Whether `definition` itself has been built by the tree's resolver
    pub fn is_resolved<T>(&self, definition: &ModuleDefinition<T>) -> bool {
        self.inner.resolver.is_resolved(definition)
    }

    /// Install a plugin for nodes created here from now on
    pub fn use_plugin(&self, plugin: impl Plugin + 'static) {
        debug!(plugin = %plugin.name(), domain = %self.inner.path, "plugin installed");
        self.inner.plugins.borrow_mut().push(Rc::new(plugin));
    }

    /// Batch with the tree's configured mode
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        batch_with(self.inner.config.batch_mode, f)
    }

    /// Paths of the stores this domain owns, in creation order
    pub fn store_paths(&self) -> Vec<String> {
        self.inner
            .stores
            .borrow()
            .iter()
            .map(|store| store.path().to_string())
            .collect()
    }

    /// Direct child domains, in creation order
    pub fn subdomains(&self) -> Vec<Domain> {
        self.inner.subdomains.borrow().clone()
    }

    pub(crate) fn traces_dispatch(&self) -> bool {
        self.inner.config.trace_dispatch
    }

    /// Deliver `event` to `on_any_dispatch` here and on every ancestor
    pub(crate) fn bubble(&self, event: &DispatchEvent) {
        let mut current = Some(self);
        while let Some(domain) = current {
            domain.inner.any_dispatches.emit(event);
            current = domain.inner.parent.as_ref();
        }
    }

    /// Hand `action` to every owned store, then every subdomain. Never bubbles.
    fn receive_broadcast(&self, action: &Rc<Action>) {
        for member in self.members() {
            member.receive_broadcast(action);
        }
    }

    fn members(&self) -> Vec<Member> {
        let stores = self.inner.stores.borrow();
        let subdomains = self.inner.subdomains.borrow();
        let members: Vec<Member> = stores
            .iter()
            .cloned()
            .map(Member::Store)
            .chain(subdomains.iter().cloned().map(Member::Domain))
            .collect();
        members
    }

    fn plugins_for(&self, kind: NodeKind, name: &str) -> Vec<Rc<dyn Plugin>> {
        applicable(&self.inner.plugins.borrow(), kind, name)
    }

    fn claim_name(&self, name: &str) -> Result<()> {
        validate_name(&self.inner.path, name)?;
        if !self.inner.names.borrow_mut().insert(name.to_string()) {
            return Err(Error::duplicate_name(self.inner.path.clone(), name));
        }
        Ok(())
    }
}

fn validate_name(parent: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(parent, name, "names must not be empty"));
    }
    if name.contains('.') {
        return Err(Error::invalid_name(parent, name, "names must not contain '.'"));
    }
    Ok(())
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("path", &self.inner.path)
            .field("stores", &self.inner.stores.borrow().len())
            .field("subdomains", &self.inner.subdomains.borrow().len())
            .finish()
    }
}

/// What a domain thunk can do
#[derive(Clone)]
pub struct DomainThunk {
    domain: Domain,
}

impl DomainThunk {
    pub fn dispatch(&self, action: impl Into<Action>) {
        self.domain.dispatch(action);
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }
}
