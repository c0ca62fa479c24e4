//! Unified precedence resolution for configuration.
//!
//! ## Data directory (highest to lowest)
//!
//! 1. `--data-dir` CLI flag
//! 2. `KS_DATA_DIR` environment variable
//! 3. `~/.local/share/keystone/`
//!
//! ## Preferences (highest to lowest)
//!
//! 1. CLI flags
//! 2. config.kdl
//! 3. Built-in defaults
//!
//! ## API key
//!
//! `KEYSTONE_API_KEY`, then `API_KEY`. The key is never written to disk.

use crate::ai::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::config::{KeystoneConfig, OutputFormat};
use crate::storage::default_data_dir;
use crate::{Error, Result};
use kdl::KdlDocument;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "KS_DATA_DIR";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "KS_CONFIG";

/// Environment variable holding the AI API key.
pub const API_KEY_ENV: &str = "KEYSTONE_API_KEY";

/// Fallback API key variable.
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Location of config.kdl (may not exist)
    pub config_path: PathBuf,
    pub data_dir: Resolved<PathBuf>,
    pub output_format: Resolved<OutputFormat>,
    pub backup_dir: Resolved<PathBuf>,
    pub ai_model: Resolved<String>,
    pub ai_timeout_secs: Resolved<u64>,
    pub api_key: Option<Resolved<String>>,
}

impl ResolvedConfig {
    pub fn data_dir(&self) -> &Path {
        &self.data_dir.value
    }

    pub fn is_human(&self) -> bool {
        self.output_format.value == OutputFormat::Human
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|r| r.value.as_str())
    }

    /// Get the masked API key for display purposes.
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|r| {
            let chars: Vec<char> = r.value.chars().collect();
            let head: String = chars.iter().take(4).collect();
            if chars.len() <= 12 {
                format!("{}...", head)
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("{}...{}", head, tail)
            }
        })
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Location of config.kdl given an environment lookup.
fn config_path_from(env: &dyn Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(path) = env(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    if let Some(dir) = env(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir).join("config.kdl"));
    }
    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("keystone").join("config.kdl"))
}

/// Location of config.kdl for this process.
pub fn config_path() -> Result<PathBuf> {
    config_path_from(&process_env)
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Read config.kdl. A missing file yields the empty config.
pub fn read_config(path: &Path) -> Result<KeystoneConfig> {
    if !path.exists() {
        return Ok(KeystoneConfig::default());
    }
    let text = fs::read_to_string(path)?;
    let doc: KdlDocument = text
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(KeystoneConfig::from_kdl(&doc))
}

/// Validate and write config.kdl, creating parent directories.
pub fn write_config(path: &Path, config: &KeystoneConfig) -> Result<()> {
    config.validate().map_err(Error::Config)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config.to_kdl().to_string())?;
    Ok(())
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    resolve_config_with_env(overrides, &process_env)
}

/// Resolve configuration using `env` for environment lookups.
pub fn resolve_config_with_env(
    overrides: &ConfigOverrides,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let config_path = config_path_from(env)?;
    let file = read_config(&config_path)?;

    let data_dir = if let Some(ref dir) = overrides.data_dir {
        Resolved::new(dir.clone(), ValueSource::CliFlag)
    } else if let Some(dir) = env(DATA_DIR_ENV) {
        Resolved::new(
            PathBuf::from(dir),
            ValueSource::EnvVar(DATA_DIR_ENV.to_string()),
        )
    } else {
        Resolved::new(default_data_dir()?, ValueSource::Default)
    };

    let output_format = if let Some(ref format) = overrides.output_format {
        Resolved::new(format.clone(), ValueSource::CliFlag)
    } else if let Some(ref format) = file.output_format {
        Resolved::new(format.clone(), ValueSource::ConfigFile)
    } else {
        Resolved::new(OutputFormat::Json, ValueSource::Default)
    };

    let backup_dir = match file.backup_dir {
        Some(dir) => Resolved::new(dir, ValueSource::ConfigFile),
        None => Resolved::new(std::env::current_dir()?, ValueSource::Default),
    };

    let ai_model = match file.ai_model {
        Some(model) => Resolved::new(model, ValueSource::ConfigFile),
        None => Resolved::new(DEFAULT_MODEL.to_string(), ValueSource::Default),
    };

    let ai_timeout_secs = match file.ai_timeout_secs {
        Some(secs) => Resolved::new(secs, ValueSource::ConfigFile),
        None => Resolved::new(DEFAULT_TIMEOUT_SECS, ValueSource::Default),
    };

    let api_key = [API_KEY_ENV, FALLBACK_API_KEY_ENV]
        .into_iter()
        .find_map(|name| {
            env(name).map(|key| Resolved::new(key, ValueSource::EnvVar(name.to_string())))
        });

    Ok(ResolvedConfig {
        config_path,
        data_dir,
        output_format,
        backup_dir,
        ai_model,
        ai_timeout_secs,
        api_key,
    })
}
