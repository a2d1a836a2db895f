//! Engine configuration, consumed once at construction time.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::item::ItemKind;
use crate::rules::TransitionRule;

/// Construction-time configuration for an engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Custom work item kinds accepted in addition to the built-ins.
    /// Names are matched case-insensitively.
    #[serde(default)]
    pub extra_kinds: Vec<String>,

    /// Duration assigned to items without an estimate during scheduling
    /// analysis.
    #[serde(default = "default_duration")]
    pub default_duration: u32,

    /// Custom transition rules, evaluated in list order.
    #[serde(default)]
    pub rules: Vec<TransitionRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extra_kinds: Vec::new(),
            default_duration: default_duration(),
            rules: Vec::new(),
        }
    }
}

const fn default_duration() -> u32 {
    1
}

/// Error returned when the config document cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("config parse error: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

impl EngineConfig {
    /// Parse a TOML config document.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] on malformed TOML or unknown rule shapes.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file. A missing file yields the
    /// defaults; a malformed one is an error.
    ///
    /// # Errors
    ///
    /// I/O or parse failures, with the offending path in the context.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str::<Self>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Whether the kind is acceptable under this config: built-in, or
    /// listed in `extra_kinds`.
    #[must_use]
    pub fn accepts_kind(&self, kind: &ItemKind) -> bool {
        match kind {
            ItemKind::Custom(name) => self
                .extra_kinds
                .iter()
                .any(|k| k.eq_ignore_ascii_case(name)),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let config = EngineConfig::default();
        assert!(config.extra_kinds.is_empty());
        assert_eq!(config.default_duration, 1);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn parses_toml_with_rules() {
        let toml = r#"
            extra_kinds = ["spike", "incident"]
            default_duration = 2

            [[rules]]
            name = "critical-needs-estimate"

            [rules.when]
            type = "target_state"
            to = "in_progress"

            [rules.require]
            type = "has_estimate"
        "#;

        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.extra_kinds, vec!["spike", "incident"]);
        assert_eq!(config.default_duration, 2);
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].name, "critical-needs-estimate");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.default_duration, 1);
    }

    #[test]
    fn malformed_document_errors() {
        assert!(EngineConfig::from_toml_str("default_duration = \"lots\"").is_err());
    }

    #[test]
    fn load_reads_file_or_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sinew.toml");

        let config = EngineConfig::load(&path).expect("missing file is fine");
        assert_eq!(config.default_duration, 1);

        std::fs::write(&path, "default_duration = 4").expect("write config");
        let config = EngineConfig::load(&path).expect("load config");
        assert_eq!(config.default_duration, 4);

        std::fs::write(&path, "default_duration = [").expect("write config");
        assert!(EngineConfig::load(&path).is_err());
    }

    #[test]
    fn kind_acceptance() {
        let config = EngineConfig {
            extra_kinds: vec!["spike".to_string()],
            ..EngineConfig::default()
        };

        assert!(config.accepts_kind(&ItemKind::Bug));
        assert!(config.accepts_kind(&ItemKind::Custom("spike".to_string())));
        assert!(config.accepts_kind(&ItemKind::Custom("Spike".to_string())));
        assert!(!config.accepts_kind(&ItemKind::Custom("research".to_string())));
    }
}
