//! Builder methods for creating errors with context

use super::types::Error;

impl Error {
    /// Create a module-already-resolved error
    #[must_use]
    pub fn module_already_resolved(module: impl Into<String>) -> Self {
        Error::ModuleAlreadyResolved {
            module: module.into(),
        }
    }

    /// Create a circular module error from the chain of modules under construction
    #[must_use]
    pub fn circular_module(module: impl Into<String>, chain: &[String]) -> Self {
        let module = module.into();
        let mut links = chain.to_vec();
        links.push(module.clone());
        Error::CircularModule {
            module,
            chain: links.join(" -> "),
        }
    }

    /// Create a module type mismatch error
    #[must_use]
    pub fn module_type_mismatch(module: impl Into<String>) -> Self {
        Error::ModuleTypeMismatch {
            module: module.into(),
        }
    }

    /// Create an invalid name error
    #[must_use]
    pub fn invalid_name(
        parent: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidName {
            parent: parent.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate name error
    #[must_use]
    pub fn duplicate_name(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Error::DuplicateName {
            parent: parent.into(),
            name: name.into(),
        }
    }

    /// Create an unknown strategy error
    #[must_use]
    pub fn unknown_strategy(name: impl Into<String>) -> Self {
        Error::UnknownStrategy { name: name.into() }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Wrap `self` with a note on what was being attempted
    #[must_use]
    pub fn with_note(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any context notes
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether this error is a setup-ordering problem that retrying cannot fix
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::ModuleAlreadyResolved { .. }
                | Error::CircularModule { .. }
                | Error::InvalidName { .. }
                | Error::DuplicateName { .. }
                | Error::UnknownStrategy { .. }
                | Error::Configuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_module_renders_chain() {
        let err = Error::circular_module("b", &["a".to_string(), "b".to_string()]);
        assert_eq!(
            err.to_string(),
            "circular module dependency detected while resolving 'b' (chain: a -> b -> b)"
        );
    }

    #[test]
    fn override_error_names_the_module() {
        let err = Error::module_already_resolved("clock");
        assert!(err.to_string().contains("'clock'"));
        assert!(err.is_configuration());
    }
}
