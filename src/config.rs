//! Configuration file loading.
//!
//! `.telescoperc.json` selects a preset and per-rule severities. The
//! engine itself consumes only the materialized rule list plus severity
//! overrides produced here; it never parses the configuration format.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Severity;
use crate::runner::{Rule, RuleSeverity, SeverityOverrides};

pub const CONFIG_FILE_NAME: &str = ".telescoperc.json";

/// A rule entry: either a bare severity string or a detailed object.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RuleSetting {
    Severity(String),
    Detailed {
        severity: String,
        #[serde(default)]
        options: serde_json::Value,
    },
}

impl RuleSetting {
    pub fn severity_str(&self) -> &str {
        match self {
            RuleSetting::Severity(s) => s,
            RuleSetting::Detailed { severity, .. } => severity,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default)]
    pub rules: IndexMap<String, RuleSetting>,
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default)]
    pub entrypoints: Vec<String>,
}

fn default_preset() -> String {
    "recommended".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            rules: IndexMap::new(),
            ignores: Vec::new(),
            entrypoints: Vec::new(),
        }
    }
}

impl Config {
    /// Validate severities and glob patterns.
    pub fn validate(&self) -> Result<()> {
        for (id, setting) in &self.rules {
            let severity = setting.severity_str();
            if severity != "off" && Severity::parse(severity).is_none() {
                bail!(
                    "Invalid severity \"{}\" for rule \"{}\" (expected off, warn, or error).",
                    severity,
                    id
                );
            }
        }
        for pattern in &self.ignores {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }
        Ok(())
    }

    /// Materialize the rule list and severity overrides the engine
    /// consumes.
    pub fn materialize(&self) -> (Vec<Box<dyn Rule>>, SeverityOverrides) {
        let rules = match self.preset.as_str() {
            "none" => Vec::new(),
            _ => crate::rules::recommended(),
        };
        let mut overrides = SeverityOverrides::new();
        for (id, setting) in &self.rules {
            let value = match setting.severity_str() {
                "off" => RuleSeverity::Off,
                other => match Severity::parse(other) {
                    Some(severity) => RuleSeverity::Set(severity),
                    None => continue,
                },
            };
            overrides.insert(id.clone(), value);
        }
        (rules, overrides)
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::runner::RuleSeverity;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.preset, "recommended");
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "preset": "recommended",
            "rules": {
                "tags-required": "off",
                "numeric-format": "error",
                "operation-error-responses": {"severity": "warn", "options": {}}
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());

        let (rules, overrides) = config.materialize();
        assert!(!rules.is_empty());
        assert_eq!(overrides.get("tags-required"), Some(&RuleSeverity::Off));
        assert_eq!(
            overrides.get("numeric-format"),
            Some(&RuleSeverity::Set(crate::diagnostics::Severity::Error))
        );
        assert_eq!(
            overrides.get("operation-error-responses"),
            Some(&RuleSeverity::Set(crate::diagnostics::Severity::Warning))
        );
    }

    #[test]
    fn test_invalid_severity_rejected() {
        let json = r#"{ "rules": { "tags-required": "loud" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("loud"));
    }

    #[test]
    fn test_invalid_ignore_pattern_rejected() {
        let json = r#"{ "ignores": ["[invalid"] }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("specs").join("v2");
        std::fs::create_dir_all(&sub_dir).unwrap();

        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::File::create(&config_path).unwrap();

        let found = find_config_file(&sub_dir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_stops_at_git_root() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(find_config_file(dir.path()).is_none());
    }

    #[test]
    fn test_load_config_defaults_when_missing() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let result = load_config(dir.path()).unwrap();
        assert!(!result.from_file);
        assert_eq!(result.config.preset, "recommended");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "rules": { "tags-required": "off" } }"#,
        )
        .unwrap();
        let result = load_config(dir.path()).unwrap();
        assert!(result.from_file);
        assert!(result.config.rules.contains_key("tags-required"));
    }

    #[test]
    fn test_none_preset_is_empty() {
        let json = r#"{ "preset": "none" }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let (rules, _) = config.materialize();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_default_config_json_round_trips() {
        let json = default_config_json().unwrap();
        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.preset, "recommended");
    }
}
