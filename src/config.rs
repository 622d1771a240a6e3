//! Engine configuration.
//!
//! Settings are normally built in code with the `with_*` methods. Hosts that
//! want to tune a deployed engine can read them from the environment instead:
//!
//! | variable | setting |
//! |---|---|
//! | `CROSSBIND_OBJECT_PROXY_CACHE` | [`EngineConfig::object_proxy_cache`] |
//! | `CROSSBIND_UPPERCASE_PACKAGES` | [`EngineConfig::allow_uppercase_packages`] |
//! | `CROSSBIND_INITIALIZE_TYPES` | [`EngineConfig::initialize_types`] |
//! | `CROSSBIND_DEFAULT_ENCODING` | [`EngineConfig::default_encoding`] |

use encoding_rs::Encoding;
use thiserror::Error;

pub const ENV_OBJECT_PROXY_CACHE: &str = "CROSSBIND_OBJECT_PROXY_CACHE";
pub const ENV_UPPERCASE_PACKAGES: &str = "CROSSBIND_UPPERCASE_PACKAGES";
pub const ENV_INITIALIZE_TYPES: &str = "CROSSBIND_INITIALIZE_TYPES";
pub const ENV_DEFAULT_ENCODING: &str = "CROSSBIND_DEFAULT_ENCODING";

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{var}: expected a boolean, got '{value}'")]
    InvalidFlag { var: &'static str, value: String },

    #[error("{var}: unknown encoding '{label}'")]
    UnknownEncoding { var: &'static str, label: String },
}

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Route every wrap through the identity cache.
    pub object_proxy_cache: bool,
    /// Let upper-case path segments below the top level name packages.
    pub allow_uppercase_packages: bool,
    /// Run static initialization when loading native types.
    pub initialize_types: bool,
    /// Encoding assumed for managed strings without an encoding tag.
    pub default_encoding: &'static Encoding,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            object_proxy_cache: false,
            allow_uppercase_packages: false,
            initialize_types: true,
            default_encoding: encoding_rs::UTF_8,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object_proxy_cache(mut self, enabled: bool) -> Self {
        self.object_proxy_cache = enabled;
        self
    }

    pub fn with_uppercase_packages(mut self, allowed: bool) -> Self {
        self.allow_uppercase_packages = allowed;
        self
    }

    pub fn with_initialize_types(mut self, initialize: bool) -> Self {
        self.initialize_types = initialize;
        self
    }

    pub fn with_default_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    /// Defaults overridden by any `CROSSBIND_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_OBJECT_PROXY_CACHE) {
            config.object_proxy_cache = parse_flag(ENV_OBJECT_PROXY_CACHE, &value)?;
        }
        if let Some(value) = lookup(ENV_UPPERCASE_PACKAGES) {
            config.allow_uppercase_packages = parse_flag(ENV_UPPERCASE_PACKAGES, &value)?;
        }
        if let Some(value) = lookup(ENV_INITIALIZE_TYPES) {
            config.initialize_types = parse_flag(ENV_INITIALIZE_TYPES, &value)?;
        }
        if let Some(label) = lookup(ENV_DEFAULT_ENCODING) {
            config.default_encoding = Encoding::for_label(label.trim().as_bytes()).ok_or(
                ConfigError::UnknownEncoding {
                    var: ENV_DEFAULT_ENCODING,
                    label,
                },
            )?;
        }
        Ok(config)
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}
