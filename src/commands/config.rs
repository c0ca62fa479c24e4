//! Config commands.

use super::{Output, json_string};
use crate::config::{ResolvedConfig, read_config, write_config};
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigShown {
    pub config_path: PathBuf,
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigShown {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Config file: {}", self.config_path.display())];
        for entry in &self.entries {
            lines.push(format!(
                "  {:<16} {} ({})",
                entry.key, entry.value, entry.source
            ));
        }
        lines.join("\n")
    }
}

/// Resolved configuration with the source of each value.
pub fn config_show(config: &ResolvedConfig) -> ConfigShown {
    let entry = |key: &'static str, value: String, source: String| ConfigEntry { key, value, source };
    let mut entries = vec![
        entry(
            "data-dir",
            config.data_dir.value.display().to_string(),
            config.data_dir.source.to_string(),
        ),
        entry(
            "output-format",
            config.output_format.value.to_string(),
            config.output_format.source.to_string(),
        ),
        entry(
            "backup-dir",
            config.backup_dir.value.display().to_string(),
            config.backup_dir.source.to_string(),
        ),
        entry(
            "ai-model",
            config.ai_model.value.clone(),
            config.ai_model.source.to_string(),
        ),
        entry(
            "ai-timeout-secs",
            config.ai_timeout_secs.value.to_string(),
            config.ai_timeout_secs.source.to_string(),
        ),
    ];
    match (config.masked_api_key(), config.api_key.as_ref()) {
        (Some(masked), Some(key)) => entries.push(entry("api-key", masked, key.source.to_string())),
        _ => entries.push(entry("api-key", "(not set)".to_string(), "none".to_string())),
    }
    ConfigShown {
        config_path: config.config_path.clone(),
        entries,
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigUpdated {
    pub config_path: PathBuf,
    pub key: String,
    pub value: String,
}

impl Output for ConfigUpdated {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Set {} = {} in {}",
            self.key,
            self.value,
            self.config_path.display()
        )
    }
}

/// Validate and store one key in config.kdl.
pub fn config_set(config_path: &Path, key: &str, value: &str) -> Result<ConfigUpdated> {
    let mut config = read_config(config_path)?;
    config.set_value(key, value).map_err(Error::Config)?;
    write_config(config_path, &config)?;
    Ok(ConfigUpdated {
        config_path: config_path.to_path_buf(),
        key: key.to_string(),
        value: value.to_string(),
    })
}
