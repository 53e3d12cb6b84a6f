//! Configuration
//!
//! Two layers:
//!
//! - [`FunctionSettings`]: per binding call, immutable once built.
//! - [`Config`]: process configuration loaded from `rhythm-connectors.toml`,
//!   `.env` and `RHYTHM_CONNECTORS__*` environment variables. It supplies the
//!   defaults new [`FunctionSettings`] start from.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default cap on rows returned from table-like results
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// How JSON numbers are represented at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumberPolicy {
    #[default]
    Float,
    Decimal,
}

/// Settings for one binding call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSettings {
    namespace: String,
    number_policy: NumberPolicy,
    max_rows: usize,
}

impl FunctionSettings {
    /// Settings with default number policy and row cap
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            number_policy: NumberPolicy::default(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn with_number_policy(mut self, policy: NumberPolicy) -> Self {
        self.number_policy = policy;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn number_policy(&self) -> NumberPolicy {
        self.number_policy
    }

    pub fn number_is_float(&self) -> bool {
        self.number_policy == NumberPolicy::Float
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }
}

/// Process-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    #[serde(default = "default_number_is_float")]
    pub number_is_float: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

fn default_number_is_float() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_rows: default_max_rows(),
            number_is_float: default_number_is_float(),
        }
    }
}

impl Config {
    /// Load from the default file name and the environment
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Settings for a binding into `namespace`, seeded from this config
    pub fn function_settings(&self, namespace: impl Into<String>) -> FunctionSettings {
        let policy = if self.number_is_float {
            NumberPolicy::Float
        } else {
            NumberPolicy::Decimal
        };

        FunctionSettings::new(namespace)
            .with_number_policy(policy)
            .with_max_rows(self.max_rows)
    }
}

/// Builder for [`Config`]; explicit overrides beat file and environment
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<String>,
    load_env: Option<bool>,
    log_level: Option<String>,
    max_rows: Option<usize>,
    number_is_float: Option<bool>,
}

impl ConfigBuilder {
    /// Read this file instead of searching for `rhythm-connectors.toml`
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Whether to read `.env` and `RHYTHM_CONNECTORS__*` variables (default: true)
    pub fn load_env(mut self, load: bool) -> Self {
        self.load_env = Some(load);
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn number_is_float(mut self, is_float: bool) -> Self {
        self.number_is_float = Some(is_float);
        self
    }

    pub fn build(self) -> Result<Config> {
        let load_env = self.load_env.unwrap_or(true);
        if load_env {
            // A missing .env file is fine
            let _ = dotenvy::dotenv();
        }

        let mut builder = config::Config::builder();
        builder = match &self.config_path {
            Some(path) => builder.add_source(config::File::with_name(path).required(true)),
            None => builder.add_source(config::File::with_name("rhythm-connectors").required(false)),
        };
        if load_env {
            builder = builder.add_source(
                config::Environment::with_prefix("RHYTHM_CONNECTORS")
                    .prefix_separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: Config = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(max_rows) = self.max_rows {
            config.max_rows = max_rows;
        }
        if let Some(is_float) = self.number_is_float {
            config.number_is_float = is_float;
        }

        Ok(config)
    }
}
