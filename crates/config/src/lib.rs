//! Configuration loading, validation and env substitution.
//!
//! Config files: `combchats.toml`, `combchats.yaml`/`.yml`, or
//! `combchats.json`, searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        CombchatsConfig, CombineConfig, EndpointConfig, ForwardConfig, MetricsConfig,
        TelegramConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
