//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation and single-key updates for `ks config set`

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted by config.kdl.
pub const CONFIG_KEYS: [&str; 4] = ["output-format", "backup-dir", "ai-model", "ai-timeout-secs"];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// backup-dir "/home/me/backups"
/// ai-model "gemini-2.5-flash"
/// ai-timeout-secs 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoneConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Directory backups are written to
    pub backup_dir: Option<PathBuf>,

    /// Model used by the AI gateway
    pub ai_model: Option<String>,

    /// AI request timeout in seconds
    pub ai_timeout_secs: Option<u64>,
}

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(String::from)
}

fn string_node(name: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}

impl KeystoneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(timeout) = self.ai_timeout_secs {
            if timeout == 0 || timeout > 600 {
                return Err(format!("ai-timeout-secs must be 1-600, got {}", timeout));
            }
        }
        if let Some(ref model) = self.ai_model {
            if model.trim().is_empty() {
                return Err("ai-model must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        config.output_format = first_string(doc, "output-format").and_then(|s| OutputFormat::parse(&s));
        config.backup_dir = first_string(doc, "backup-dir").map(PathBuf::from);
        config.ai_model = first_string(doc, "ai-model");

        if let Some(node) = doc.get("ai-timeout-secs") {
            if let Some(entry) = node.entries().first() {
                if let Some(i) = entry.value().as_integer() {
                    if i > 0 {
                        config.ai_timeout_secs = u64::try_from(i).ok();
                    }
                }
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref format) = self.output_format {
            doc.nodes_mut().push(string_node("output-format", format.as_str()));
        }

        if let Some(ref dir) = self.backup_dir {
            doc.nodes_mut()
                .push(string_node("backup-dir", &dir.display().to_string()));
        }

        if let Some(ref model) = self.ai_model {
            doc.nodes_mut().push(string_node("ai-model", model));
        }

        if let Some(timeout) = self.ai_timeout_secs {
            let mut node = KdlNode::new("ai-timeout-secs");
            node.push(KdlEntry::new(KdlValue::Integer(timeout as i128)));
            doc.nodes_mut().push(node);
        }

        doc
    }

    /// Set a single key from its string form, as given to `ks config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "output-format" => {
                let format = OutputFormat::parse(value)
                    .ok_or_else(|| format!("output-format must be 'json' or 'human', got '{}'", value))?;
                self.output_format = Some(format);
            }
            "backup-dir" => self.backup_dir = Some(PathBuf::from(value)),
            "ai-model" => self.ai_model = Some(value.to_string()),
            "ai-timeout-secs" => {
                let timeout = value
                    .parse::<u64>()
                    .map_err(|_| format!("ai-timeout-secs must be a number, got '{}'", value))?;
                self.ai_timeout_secs = Some(timeout);
            }
            other => {
                return Err(format!(
                    "Unknown config key '{}'. Valid keys: {}",
                    other,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== OutputFormat Tests ====================

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(format!("{}", OutputFormat::Json), "json");
        assert_eq!(format!("{}", OutputFormat::Human), "human");
    }

    // ==================== KeystoneConfig Tests ====================

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        assert_eq!(KeystoneConfig::from_kdl(&doc), KeystoneConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            output-format "human"
            backup-dir "/srv/backups"
            ai-model "gemini-2.0-flash"
            ai-timeout-secs 45
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = KeystoneConfig::from_kdl(&doc);

        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.backup_dir, Some(PathBuf::from("/srv/backups")));
        assert_eq!(config.ai_model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.ai_timeout_secs, Some(45));
    }

    #[test]
    fn test_config_ignores_bad_values() {
        let kdl = r#"
            output-format "yaml"
            ai-timeout-secs -3
            editor "vim"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        assert_eq!(KeystoneConfig::from_kdl(&doc), KeystoneConfig::default());
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = KeystoneConfig {
            output_format: Some(OutputFormat::Json),
            backup_dir: Some(PathBuf::from("/tmp/b")),
            ai_model: Some("m".to_string()),
            ai_timeout_secs: Some(10),
        };
        let parsed = KeystoneConfig::from_kdl(&config.to_kdl());
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_set_value() {
        let mut config = KeystoneConfig::new();
        config.set_value("output-format", "human").unwrap();
        config.set_value("ai-timeout-secs", "60").unwrap();
        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.ai_timeout_secs, Some(60));

        assert!(config.set_value("output-format", "xml").is_err());
        assert!(config.set_value("ai-timeout-secs", "0").is_err());
        let err = config.set_value("editor", "vim").unwrap_err();
        assert!(err.contains("Unknown config key"));
    }
}
