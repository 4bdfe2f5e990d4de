//! Actions routed through stores and domains

use canopy_core::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An immutable message describing something that happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action type, serialized as `type`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            meta: None,
        }
    }

    /// Attach a payload serialized from `payload`
    pub fn with_payload(mut self, payload: impl Serialize) -> Result<Self> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Attach free-form metadata
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Whether this action has the given type
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Decode the payload. A missing payload decodes as JSON `null`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.payload.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

impl From<&str> for Action {
    fn from(kind: &str) -> Self {
        Action::new(kind)
    }
}

impl From<String> for Action {
    fn from(kind: String) -> Self {
        Action::new(kind)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}
