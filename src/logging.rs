//! Logging setup for the CLI and for embedding applications.
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Identifies the process in log output.
    whoami: String,
    /// Directive used when `RUST_LOG` is unset.
    default_directive: String,
    with_line_numbers: bool,
}

impl LoggerConfig {
    pub fn new(whoami: impl Into<String>) -> Self {
        Self {
            whoami: whoami.into(),
            default_directive: "info".to_owned(),
            with_line_numbers: false,
        }
    }

    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.with_line_numbers = enabled;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new("ln-commitment")
    }
}

/// Installs a stderr fmt subscriber filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set.
pub fn init(config: LoggerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_line_number(config.with_line_numbers)
        .with_filter(filter);

    if tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()
        .is_ok()
    {
        info!(whoami = %config.whoami, "logging started");
    }
}
