//! Runtime configuration for a domain tree

use canopy_core::{BatchMode, Error, Result, ResultExt};
use serde::{Deserialize, Serialize};

/// Environment variable naming the root domain
pub const ROOT_NAME_ENV: &str = "CANOPY_ROOT_NAME";
/// Environment variable selecting the default batch mode
pub const BATCH_MODE_ENV: &str = "CANOPY_BATCH_MODE";
/// Environment variable enabling per-dispatch tracing spans
pub const TRACE_DISPATCH_ENV: &str = "CANOPY_TRACE_DISPATCH";

const DEFAULT_ROOT_NAME: &str = "app";

/// Settings shared by every domain in a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name (and path) of the root domain
    pub root_name: String,
    /// Mode used by `Domain::batch`
    pub batch_mode: BatchMode,
    /// Wrap every dispatch in a `dispatch` tracing span
    pub trace_dispatch: bool,
    /// Where this configuration came from
    #[serde(skip)]
    pub source: ConfigSource,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            batch_mode: BatchMode::Sync,
            trace_dispatch: false,
            source: ConfigSource::Default,
        }
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    #[default]
    Default,
    /// Parsed from a JSON document
    Json,
    /// Environment variables
    EnvironmentVariable(String),
    /// Assembled in code
    Builder,
}

impl RuntimeConfig {
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::new()
    }

    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: RuntimeConfig =
            serde_json::from_str(json).context("parsing runtime configuration")?;
        config.source = ConfigSource::Json;
        Ok(config)
    }

    /// Defaults overridden by any `CANOPY_*` variables that are set
    pub fn from_env() -> Result<Self> {
        let mut config = RuntimeConfig::default();
        let mut has_env_config = false;

        if let Ok(name) = std::env::var(ROOT_NAME_ENV) {
            config.root_name = name;
            has_env_config = true;
        }

        if let Ok(mode) = std::env::var(BATCH_MODE_ENV) {
            config.batch_mode = mode
                .parse::<BatchMode>()
                .with_context(|| format!("reading {BATCH_MODE_ENV}"))?;
            has_env_config = true;
        }

        if let Ok(flag) = std::env::var(TRACE_DISPATCH_ENV) {
            config.trace_dispatch = parse_flag(&flag).ok_or_else(|| {
                Error::configuration(format!(
                    "{TRACE_DISPATCH_ENV} must be true or false, got '{flag}'"
                ))
            })?;
            has_env_config = true;
        }

        if has_env_config {
            config.source = ConfigSource::EnvironmentVariable("CANOPY_*".to_string());
        }
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Builder for creating runtime configurations
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig {
                source: ConfigSource::Builder,
                ..RuntimeConfig::default()
            },
        }
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.config.root_name = name.into();
        self
    }

    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.config.batch_mode = mode;
        self
    }

    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.config.trace_dispatch = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}

impl Default for RuntimeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [ROOT_NAME_ENV, BATCH_MODE_ENV, TRACE_DISPATCH_ENV] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn builder_sets_fields() {
        let config = RuntimeConfig::builder()
            .with_root_name("shop")
            .with_batch_mode(BatchMode::Async)
            .with_trace_dispatch(true)
            .build();

        assert_eq!(config.root_name, "shop");
        assert_eq!(config.batch_mode, BatchMode::Async);
        assert!(config.trace_dispatch);
        assert_eq!(config.source, ConfigSource::Builder);
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = RuntimeConfig::from_json_str(r#"{"batch_mode": "async"}"#).unwrap();
        assert_eq!(config.root_name, "app");
        assert_eq!(config.batch_mode, BatchMode::Async);
        assert_eq!(config.source, ConfigSource::Json);
    }

    #[test]
    fn json_errors_carry_context() {
        let err = RuntimeConfig::from_json_str(r#"{"batch_mode": "later"}"#).unwrap_err();
        assert!(err.to_string().starts_with("parsing runtime configuration: JSON error:"));
        assert!(matches!(err.root_cause(), Error::Json { .. }));
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        clear_env();
        std::env::set_var(ROOT_NAME_ENV, "editor");
        std::env::set_var(BATCH_MODE_ENV, "Async");
        std::env::set_var(TRACE_DISPATCH_ENV, "yes");

        let config = RuntimeConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.root_name, "editor");
        assert_eq!(config.batch_mode, BatchMode::Async);
        assert!(config.trace_dispatch);
        assert_eq!(
            config.source,
            ConfigSource::EnvironmentVariable("CANOPY_*".to_string())
        );
    }

    #[test]
    #[serial]
    fn env_rejects_bad_values() {
        clear_env();
        std::env::set_var(TRACE_DISPATCH_ENV, "sometimes");
        let err = RuntimeConfig::from_env().unwrap_err();
        clear_env();

        assert!(err.is_configuration());
        assert_eq!(RuntimeConfig::from_env().unwrap(), RuntimeConfig::default());
    }
}
