//! Dispatch events observed through `on_dispatch` and `on_any_dispatch`

use crate::action::Action;
use serde::Serialize;
use std::rc::Rc;

/// Kind of node a dispatch started at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Store,
    Domain,
}

/// A dispatched action together with where it was dispatched
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    pub action: Rc<Action>,
    /// Path of the store or domain `dispatch` was called on
    pub source: String,
    pub origin: Origin,
}

impl DispatchEvent {
    pub(crate) fn new(action: Rc<Action>, source: impl Into<String>, origin: Origin) -> Self {
        Self {
            action,
            source: source.into(),
            origin,
        }
    }
}
