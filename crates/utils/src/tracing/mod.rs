use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, span, trace, warn, Level, Span};

/// Environment variable holding the canopy log filter
pub const LOG_ENV: &str = "CANOPY_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// The filter directive in effect: `CANOPY_LOG`, then `RUST_LOG`, then `warn`
pub fn filter_directive() -> String {
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_new(filter_directive()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Initialize the tracing system
///
/// Installs a compact formatter on stderr filtered by [`filter_directive`].
/// Fails if a global subscriber is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Route logs through the test harness' captured output. Safe to call from every test.
pub fn init_for_tests() {
    let fmt_layer = fmt::layer().with_test_writer().with_target(true);
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init();
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span covering one dispatch from `source`
pub fn dispatch_span(source: &str, action_type: &str) -> Span {
    span!(Level::DEBUG, "dispatch", source = %source, action = %action_type)
}
