//! Core error type definitions

/// Result type alias for canopy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for canopy operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A module override was registered after the module had already been handed out
    #[error("cannot override module '{module}': it has already been resolved")]
    ModuleAlreadyResolved { module: String },

    /// A module factory asked for itself while it was being constructed
    #[error("circular module dependency detected while resolving '{module}' (chain: {chain})")]
    CircularModule { module: String, chain: String },

    /// A cached module instance did not have the type its definition promised
    #[error("module '{module}' resolved to an instance of an unexpected type")]
    ModuleTypeMismatch { module: String },

    /// Store, domain or derived store names must be non-empty and dot-free
    #[error("invalid name '{name}' under '{parent}': {reason}")]
    InvalidName {
        parent: String,
        name: String,
        reason: String,
    },

    /// Sibling names under a domain must be unique
    #[error("'{parent}' already owns a node named '{name}'")]
    DuplicateName { parent: String, name: String },

    /// Unrecognised equality strategy shorthand
    #[error("unknown equality strategy '{name}' (expected strict, shallow, shallow2, shallow3 or deep)")]
    UnknownStrategy { name: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Another canopy error, annotated with what was being attempted
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}
