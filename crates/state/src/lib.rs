//! Hierarchical, synchronous state propagation.
//!
//! - **`domain`**: the [`Domain`] tree that routes actions down and bubbles
//!   dispatch events up.
//! - **`store`**: reducer-driven [`Store`]s with equality-gated change
//!   notifications, scheduled through `canopy_core::scheduler`.
//! - **`derived`**: [`DerivedStore`]s computed from other stores, lazy while
//!   unobserved and eager while observed.
//! - **`resolver`**: lazy-singleton modules shared by a whole tree.
//! - **`plugin`**: creation hooks for stores, domains and modules.
//! - **`config`**: [`RuntimeConfig`] shared by every domain of a tree.

pub mod action;
pub mod config;
pub mod derived;
pub mod domain;
pub mod event;
pub mod plugin;
pub mod resolver;
pub mod store;

pub use self::{
    action::Action,
    config::{ConfigSource, RuntimeConfig, RuntimeConfigBuilder},
    derived::{Dependencies, DerivedStore, Readable},
    domain::{Domain, DomainThunk},
    event::{DispatchEvent, Origin},
    plugin::{ModuleInfo, NodeKind, NodeOptions, Plugin},
    resolver::{ModuleDefinition, ModuleId, OverrideHandle, Resolver},
    store::{Reducer, Store, StoreConfig, StoreNode, StoreThunk},
};

pub use canopy_core::{
    batch, batch_with, BatchMode, Equality, EqualityStrategy, Error, Result, StructuralEq,
    Subscription,
};
