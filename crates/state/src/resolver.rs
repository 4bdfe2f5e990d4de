//! Lazy-singleton module resolution
//!
//! A [`ModuleDefinition`] describes how to build one shared instance from the
//! root domain. The [`Resolver`] owned by a domain tree builds each effective
//! definition at most once and hands the same `Rc` to every caller.
//! Overrides swap one definition for another, but only while the source
//! definition has no cached instance; once built, the instance may already be
//! held elsewhere and replacing it would split the object graph.

use crate::domain::Domain;
use crate::plugin::{applicable, ModuleInfo, NodeKind, Plugin};
use canopy_core::{Error, Result};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Stable identity of a module definition, assigned when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ModuleId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Factory<T> = Box<dyn Fn(&Domain) -> T>;

struct DefinitionInner<T> {
    id: ModuleId,
    name: String,
    factory: Factory<T>,
}

/// Type-erased view of a definition, as stored in the override table
trait ErasedModule {
    fn id(&self) -> ModuleId;
    fn name(&self) -> &str;
    fn build(&self, root: &Domain) -> Rc<dyn Any>;
}

impl<T: 'static> ErasedModule for DefinitionInner<T> {
    fn id(&self) -> ModuleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self, root: &Domain) -> Rc<dyn Any> {
        Rc::new((self.factory)(root))
    }
}

/// How to construct a shared module of type `T`
///
/// Clones share the same identity.
pub struct ModuleDefinition<T> {
    inner: Rc<DefinitionInner<T>>,
}

impl<T: 'static> ModuleDefinition<T> {
    /// Define a module. The factory always receives the root domain.
    pub fn new(name: impl Into<String>, factory: impl Fn(&Domain) -> T + 'static) -> Self {
        Self {
            inner: Rc::new(DefinitionInner {
                id: ModuleId::next(),
                name: name.into(),
                factory: Box::new(factory),
            }),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn erased(&self) -> Rc<dyn ErasedModule> {
        self.inner.clone()
    }
}

impl<T> Clone for ModuleDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for ModuleDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

#[derive(Default)]
struct ResolverState {
    /// Instances keyed by the definition that built them
    cache: HashMap<ModuleId, Rc<dyn Any>>,
    /// Source definition -> replacement definition
    overrides: HashMap<ModuleId, Rc<dyn ErasedModule>>,
    /// Definitions whose factories are running, outermost first
    building: Vec<(ModuleId, String)>,
}

/// Module cache shared by every domain of one tree
#[derive(Default)]
pub struct Resolver {
    state: RefCell<ResolverState>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `definition`, building it on first use.
    ///
    /// No borrow of the resolver is held while a factory runs, so factories
    /// may resolve their own dependencies. A factory that (indirectly)
    /// resolves itself fails with `CircularModule`.
    pub fn get<T: 'static>(
        &self,
        root: &Domain,
        definition: &ModuleDefinition<T>,
        plugins: &[Rc<dyn Plugin>],
    ) -> Result<Rc<T>> {
        let effective = {
            let state = self.state.borrow();
            state
                .overrides
                .get(&definition.id())
                .cloned()
                .unwrap_or_else(|| definition.erased())
        };
        let id = effective.id();

        let cached = self.state.borrow().cache.get(&id).cloned();
        if let Some(instance) = cached {
            trace!(module = %effective.name(), "module cache hit");
            return downcast(instance, effective.name());
        }

        {
            let state = self.state.borrow();
            if state.building.iter().any(|(building, _)| *building == id) {
                let chain: Vec<String> =
                    state.building.iter().map(|(_, name)| name.clone()).collect();
                return Err(Error::circular_module(effective.name(), &chain));
            }
        }

        let info = ModuleInfo {
            id,
            name: effective.name().to_string(),
        };
        let plugins = applicable(plugins, NodeKind::Module, &info.name);
        for plugin in &plugins {
            plugin.pre_module(&info);
        }

        let instance = {
            let _building = BuildingGuard::push(self, id, &info.name);
            effective.build(root)
        };
        debug!(module = %info.name, id = %id, "module constructed");

        for plugin in &plugins {
            plugin.post_module(&info, &instance);
        }

        self.state.borrow_mut().cache.insert(id, instance.clone());

        downcast(instance, &info.name)
    }

    /// Replace `source` with `replacement` for every later `get(source)`.
    ///
    /// Fails once an instance of `source` itself has been cached.
    pub fn override_module<T: 'static>(
        self: &Rc<Self>,
        source: &ModuleDefinition<T>,
        replacement: &ModuleDefinition<T>,
    ) -> Result<OverrideHandle> {
        let mut state = self.state.borrow_mut();
        if state.cache.contains_key(&source.id()) {
            warn!(module = %source.name(), "rejected override of a module already in use");
            return Err(Error::module_already_resolved(source.name()));
        }

        state.overrides.insert(source.id(), replacement.erased());
        debug!(
            module = %source.name(),
            replacement = %replacement.name(),
            "module override registered"
        );

        Ok(OverrideHandle {
            resolver: RefCell::new(Some(Rc::downgrade(self))),
            source: source.id(),
            replacement: replacement.id(),
            name: source.name().to_string(),
        })
    }

    /// Whether an instance has been built for `definition` itself
    pub fn is_resolved<T>(&self, definition: &ModuleDefinition<T>) -> bool {
        self.state.borrow().cache.contains_key(&definition.inner.id)
    }

    fn revert(&self, source: ModuleId, replacement: ModuleId) -> bool {
        let mut state = self.state.borrow_mut();
        let current = state.overrides.get(&source).map(|module| module.id());
        if current == Some(replacement) {
            state.overrides.remove(&source);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Resolver")
            .field("cached", &state.cache.len())
            .field("overrides", &state.overrides.len())
            .finish()
    }
}

fn downcast<T: 'static>(instance: Rc<dyn Any>, name: &str) -> Result<Rc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| Error::module_type_mismatch(name))
}

/// Marks a definition as under construction until dropped
struct BuildingGuard<'a> {
    resolver: &'a Resolver,
}

impl<'a> BuildingGuard<'a> {
    fn push(resolver: &'a Resolver, id: ModuleId, name: &str) -> Self {
        resolver
            .state
            .borrow_mut()
            .building
            .push((id, name.to_string()));
        Self { resolver }
    }
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.resolver.state.borrow_mut().building.pop();
    }
}

/// Undoes one override
///
/// Reverting does not bring back an instance built before the override; the
/// next `get(source)` builds a fresh one. Calling `revert` more than once is
/// harmless, and a handle never removes a newer override of the same source.
pub struct OverrideHandle {
    resolver: RefCell<Option<Weak<Resolver>>>,
    source: ModuleId,
    replacement: ModuleId,
    name: String,
}

impl OverrideHandle {
    pub fn revert(&self) {
        let resolver = self.resolver.borrow_mut().take();
        if let Some(resolver) = resolver.and_then(|weak| weak.upgrade()) {
            if resolver.revert(self.source, self.replacement) {
                debug!(module = %self.name, "module override reverted");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.resolver.borrow().is_some()
    }
}

impl fmt::Debug for OverrideHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideHandle")
            .field("module", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}
