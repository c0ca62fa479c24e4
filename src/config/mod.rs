//! Configuration for Keystone.
//!
//! ## config.kdl - User preferences
//!
//! Located at (first match wins):
//! - `$KS_CONFIG`
//! - `$KS_DATA_DIR/config.kdl`
//! - `~/.config/keystone/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `backup-dir` - Where `ks backup download` writes files
//! - `ai-model` - Model used by the AI gateway
//! - `ai-timeout-secs` - AI request timeout
//!
//! The AI API key is only read from the environment.
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    API_KEY_ENV, CONFIG_ENV, ConfigOverrides, DATA_DIR_ENV, Resolved, ResolvedConfig,
    ValueSource, config_path, read_config, resolve_config, write_config,
};
pub use schema::{CONFIG_KEYS, KeystoneConfig, OutputFormat};
