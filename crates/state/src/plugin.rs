//! Creation hooks for stores, domains and modules
//!
//! A plugin installed on a domain with `Domain::use_plugin` sees every store,
//! subdomain and module created through that domain afterwards. Subdomains
//! copy their parent's plugin list when they are created, so a plugin added
//! later is never applied retroactively.

use crate::domain::Domain;
use crate::resolver::ModuleId;
use crate::store::StoreNode;
use std::any::Any;
use std::rc::Rc;

/// The kind of node a plugin hook is about to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Store,
    Domain,
    Module,
}

/// Creation options a `pre_*` hook may rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOptions {
    pub name: String,
}

impl NodeOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A module about to be constructed, or just constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: String,
}

/// Observer of node creation. Every hook defaults to doing nothing.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Whether the hooks below run for a node of `kind` named `name`
    fn filter(&self, _kind: NodeKind, _name: &str) -> bool {
        true
    }

    fn pre_store(&self, _options: &mut NodeOptions) {}

    fn post_store(&self, _store: &dyn StoreNode) {}

    fn pre_domain(&self, _options: &mut NodeOptions) {}

    fn post_domain(&self, _domain: &Domain) {}

    fn pre_module(&self, _module: &ModuleInfo) {}

    fn post_module(&self, _module: &ModuleInfo, _instance: &Rc<dyn Any>) {}
}

/// The plugins from `plugins` whose filter accepts the node
pub(crate) fn applicable(
    plugins: &[Rc<dyn Plugin>],
    kind: NodeKind,
    name: &str,
) -> Vec<Rc<dyn Plugin>> {
    plugins
        .iter()
        .filter(|plugin| plugin.filter(kind, name))
        .cloned()
        .collect()
}
