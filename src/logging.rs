//! Logging setup.
//!
//! The engine logs through `tracing` and never installs a subscriber itself.
//! Hosts without their own subscriber can call [`init_logging`].

use tracing_subscriber::{EnvFilter, fmt};

/// Variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "CROSSBIND_LOG";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when neither variable is set.
    pub default_directive: String,
    pub with_target: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        let default_directive = if cfg!(debug_assertions) {
            "crossbind=debug,crossbind_registry=debug,crossbind_dispatch=info"
        } else {
            "crossbind=info,crossbind_registry=info,crossbind_dispatch=warn"
        };
        Self {
            default_directive: default_directive.to_string(),
            with_target: true,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
    }
}

/// Install a compact fmt subscriber. Returns false if one was already installed.
pub fn init_logging(config: &LogConfig) -> bool {
    fmt()
        .with_env_filter(config.filter())
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .compact()
        .try_init()
        .is_ok()
}
