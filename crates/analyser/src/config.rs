//! Configuration loading for the analyser.
//!
//! All analyser settings are loaded from a TOML configuration file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use module_engine::{display_order, FilterError};

/// Complete analyser configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyserConfig {
    /// Run settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,
    /// Counting modules declared in configuration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counters: Vec<CounterConfig>,
}

impl AnalyserConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects counters without a handle or event types.
    fn validate(&self) -> Result<(), SettingsError> {
        for counter in &self.counters {
            if counter.handle.is_empty() {
                return Err(SettingsError::Counter {
                    handle: counter.handle.clone(),
                    reason: "handle is empty".to_string(),
                });
            }
            if counter.events.is_empty() {
                return Err(SettingsError::Counter {
                    handle: counter.handle.clone(),
                    reason: "no event types to count".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Whether a built-in module is enabled.
    pub fn is_enabled(&self, handle: &str) -> bool {
        !self.analysis.disabled_modules.iter().any(|h| h == handle)
    }
}

/// Run settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Built-in module handles to leave out of the run
    pub disabled_modules: Vec<String>,
    /// Abort on an event whose timestamp goes backwards instead of warning
    pub strict_order: bool,
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write indented JSON
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// A counting module declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Module handle, unique within the run
    pub handle: String,
    /// Report title; derived from the handle when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Report position
    #[serde(default = "default_counter_order")]
    pub display_order: i32,
    /// Event types to count
    pub events: Vec<String>,
    /// Filter table, with `by` / `to` / `abilityId` shorthands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Sum this numeric field instead of counting events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_field: Option<String>,
}

fn default_counter_order() -> i32 {
    display_order::DEFAULT
}

/// Errors that can occur while loading or applying configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing TOML config
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Error serializing config to TOML
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// A counter declaration is unusable
    #[error("counter `{handle}`: {reason}")]
    Counter { handle: String, reason: String },
    /// `disabled_modules` names a module that does not exist
    #[error("cannot disable unknown module `{handle}`")]
    UnknownModule { handle: String },
    /// A counter filter table is malformed
    #[error("counter `{handle}` filter: {source}")]
    Filter {
        handle: String,
        #[source]
        source: FilterError,
    },
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Analyser Configuration

[analysis]
disabled_modules = []
strict_order = false

[output]
pretty = true

# Counting modules. `filter` accepts the same keys as hook filters:
# `by` / `to` ("player", "pet" or an id), `abilityId`, and raw event fields.
#
# [[counters]]
# handle = "fireCasts"
# title = "Fire casts"
# events = ["cast"]
# filter = { by = "player", abilityId = 7505 }
#
# [[counters]]
# handle = "damageTaken"
# title = "Damage taken"
# events = ["damage"]
# filter = { to = "player" }
# sum_field = "amount"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = AnalyserConfig::default();

        assert!(config.analysis.disabled_modules.is_empty());
        assert!(!config.analysis.strict_order);
        assert!(config.output.pretty);
        assert!(config.counters.is_empty());
    }

    #[test]
    fn test_default_config_toml_parses() {
        let config = AnalyserConfig::from_str(&default_config_toml()).unwrap();

        assert!(config.output.pretty);
        assert!(config.counters.is_empty());
    }

    #[test]
    fn test_parse_config_from_toml() {
        let toml = r#"
            [analysis]
            disabled_modules = ["suggestions"]
            strict_order = true

            [output]
            pretty = false

            [[counters]]
            handle = "fireCasts"
            title = "Fire casts"
            events = ["cast"]
            filter = { by = "player", abilityId = [7505, 3577] }

            [[counters]]
            handle = "damageTaken"
            events = ["damage"]
            display_order = 60
            filter = { to = "player" }
            sum_field = "amount"
        "#;

        let config = AnalyserConfig::from_str(toml).unwrap();

        assert!(config.analysis.strict_order);
        assert!(!config.is_enabled("suggestions"));
        assert!(config.is_enabled("casts"));
        assert!(!config.output.pretty);
        assert_eq!(config.counters.len(), 2);

        let fire = &config.counters[0];
        assert_eq!(fire.title.as_deref(), Some("Fire casts"));
        assert_eq!(fire.display_order, display_order::DEFAULT);
        assert_eq!(fire.filter, Some(json!({ "by": "player", "abilityId": [7505, 3577] })));

        let taken = &config.counters[1];
        assert_eq!(taken.display_order, 60);
        assert_eq!(taken.sum_field.as_deref(), Some("amount"));
        assert!(taken.title.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
            [analysis]
            strict_order = true
        "#;

        let config = AnalyserConfig::from_str(toml).unwrap();

        assert!(config.analysis.strict_order);
        assert!(config.analysis.disabled_modules.is_empty());
        assert!(config.output.pretty);
    }

    #[test]
    fn test_counter_without_events_is_rejected() {
        let toml = r#"
            [[counters]]
            handle = "nothing"
            events = []
        "#;

        let err = AnalyserConfig::from_str(toml).unwrap_err();
        assert!(matches!(err, SettingsError::Counter { ref handle, .. } if handle == "nothing"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = AnalyserConfig::from_str("[analysis\nstrict_order = ").unwrap_err();

        assert!(matches!(err, SettingsError::Toml(_)));
        assert!(err.to_string().starts_with("TOML parse error"));
    }

    #[test]
    fn test_config_to_toml_roundtrip() {
        let mut config = AnalyserConfig::default();
        config.analysis.disabled_modules.push("about".to_string());
        config.counters.push(CounterConfig {
            handle: "petCasts".to_string(),
            title: Some("Pet casts".to_string()),
            display_order: 70,
            events: vec!["cast".to_string()],
            filter: Some(json!({ "by": "pet" })),
            sum_field: None,
        });

        let toml = config.to_toml().unwrap();
        let parsed = AnalyserConfig::from_str(&toml).unwrap();

        assert_eq!(parsed.analysis.disabled_modules, vec!["about".to_string()]);
        assert_eq!(parsed.counters[0].handle, "petCasts");
        assert_eq!(parsed.counters[0].filter, Some(json!({ "by": "pet" })));
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = AnalyserConfig::from_file(Path::new("/nonexistent/analyser.toml")).unwrap_err();

        assert!(matches!(err, SettingsError::Io(_)));
    }
}
