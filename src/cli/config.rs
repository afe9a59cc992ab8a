// ABOUTME: Configuration management for the recognizer application
// ABOUTME: Loads the YAML app config from standard locations and applies environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Forces the workflow's `globals.debug` when set.
    #[serde(default)]
    pub debug: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => Some(p),
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            _ => Config::default(),
        };

        config.merge_env()?;
        Ok(config)
    }

    /// First existing config file: working directory before home directory.
    fn find_config_file() -> Option<PathBuf> {
        let mut candidates = vec![
            PathBuf::from("recognizer.yaml"),
            PathBuf::from(".recognizer.yaml"),
        ];
        if let Some(home_dir) = dirs::home_dir() {
            candidates.push(home_dir.join(".recognizer").join("config.yaml"));
        }
        candidates.into_iter().find(|path| path.exists())
    }

    fn merge_env(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("RECOGNIZER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RECOGNIZER_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(debug) = std::env::var("RECOGNIZER_DEBUG") {
            self.debug = Some(parse_flag(&debug)?);
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("RECOGNIZER_DEBUG must be a boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("recognizer.yaml");
        fs::write(
            &config_path,
            "logging:\n  level: debug\n  format: compact\ndebug: true\n",
        )
        .unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.logging.format, "compact");
        assert_eq!(config.debug, Some(true));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load(Some(temp_dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("Yes").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
