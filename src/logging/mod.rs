// ABOUTME: Single logging entry point used by the engine and the System Log action
// ABOUTME: Filters level-tagged messages and bridges them onto tracing events

pub mod level;

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub use level::{level_tag, LogLevel};

pub const DEFAULT_FORMAT: &str = "%(levelname)s - %(asctime)s - %(message)s";
pub const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S.%f";

/// Output settings carried by a workflow's `globals.logConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Optional file the rendered line is appended to; empty means none.
    pub file: String,
    pub format: String,
    pub datefmt: String,
    /// Truncate `file` once before the first message of a run.
    pub clear: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Log,
            file: String::new(),
            format: DEFAULT_FORMAT.to_string(),
            datefmt: DEFAULT_DATEFMT.to_string(),
            clear: false,
        }
    }
}

impl LogConfig {
    /// Render a line with the `%(levelname)s`, `%(asctime)s` and `%(message)s`
    /// placeholders substituted.
    pub fn render(&self, message: &str, levels: &[LogLevel]) -> String {
        let now = chrono::Local::now();
        let mut asctime = String::new();
        if write!(asctime, "{}", now.format(&self.datefmt)).is_err() {
            asctime = now.format(DEFAULT_DATEFMT).to_string();
        }
        self.format
            .replace("%(levelname)s", &level_tag(levels))
            .replace("%(asctime)s", &asctime)
            .replace("%(message)s", message)
    }

    fn file_path(&self) -> Option<PathBuf> {
        if self.file.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.file);
        if path.is_absolute() {
            return Some(path);
        }
        std::env::current_dir().ok().map(|dir| dir.join(path))
    }
}

/// Decides which messages reach the subscriber for one run.
#[derive(Debug, Clone)]
pub struct LogManager {
    debug: bool,
    config: LogConfig,
}

impl LogManager {
    /// Create a manager, truncating the log file first when `config.clear` is set.
    pub fn new(debug: bool, config: LogConfig) -> Self {
        if config.clear {
            if let Some(path) = config.file_path() {
                if let Err(e) = std::fs::write(&path, "") {
                    warn!("Failed to clear log file {}: {}", path.display(), e);
                }
            }
        }
        Self { debug, config }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// DEBUG-tagged messages need debug mode; anything else passes when one
    /// of its levels reaches the configured threshold.
    pub fn should_emit(&self, levels: &[LogLevel]) -> bool {
        if levels.is_empty() {
            return false;
        }
        if !self.debug && levels.contains(&LogLevel::Debug) {
            return false;
        }
        levels.iter().any(|level| *level >= self.config.level)
    }

    pub fn log(&self, message: &str, levels: &[LogLevel]) {
        if !self.should_emit(levels) {
            return;
        }

        let tag = level_tag(levels);
        match levels.iter().max() {
            Some(LogLevel::Critical) | Some(LogLevel::Error) => error!(levels = %tag, "{}", message),
            Some(LogLevel::Warning) => warn!(levels = %tag, "{}", message),
            Some(LogLevel::Debug) => debug!(levels = %tag, "{}", message),
            _ => info!(levels = %tag, "{}", message),
        }

        if let Some(path) = self.config.file_path() {
            self.append(&path, &self.config.render(message, levels));
        }
    }

    /// Blocking append: `log` is a plain function that also runs outside a
    /// runtime, and lines must land in the order they were logged.
    fn append(&self, path: &Path, line: &str) {
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", line));
        if let Err(e) = written {
            warn!("Failed to write log file {}: {}", path.display(), e);
        }
    }
}

/// Log `message` tagged with `levels`, honoring `debug` and the threshold in
/// `config`.
pub fn log(message: &str, levels: &[LogLevel], debug: bool, config: &LogConfig) {
    LogManager {
        debug,
        config: config.clone(),
    }
    .log(message, levels);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(debug: bool, level: LogLevel) -> LogManager {
        LogManager::new(
            debug,
            LogConfig {
                level,
                ..LogConfig::default()
            },
        )
    }

    #[test]
    fn test_debug_tagged_messages_need_debug() {
        let quiet = manager(false, LogLevel::Log);
        assert!(!quiet.should_emit(&[LogLevel::Info, LogLevel::Debug]));
        assert!(quiet.should_emit(&[LogLevel::Info]));

        let verbose = manager(true, LogLevel::Log);
        assert!(verbose.should_emit(&[LogLevel::Info, LogLevel::Debug]));
    }

    #[test]
    fn test_threshold() {
        let manager = manager(false, LogLevel::Error);
        assert!(!manager.should_emit(&[LogLevel::Warning]));
        assert!(manager.should_emit(&[LogLevel::Critical]));
        assert!(!manager.should_emit(&[]));
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let config = LogConfig {
            format: "%(levelname)s %(message)s".to_string(),
            ..LogConfig::default()
        };
        assert_eq!(
            config.render("hello", &[LogLevel::Warning, LogLevel::Debug]),
            "[WRN][DBG] hello"
        );
    }

    #[test]
    fn test_file_output_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, "stale\n").unwrap();

        let config = LogConfig {
            file: path.to_string_lossy().to_string(),
            format: "%(message)s".to_string(),
            clear: true,
            ..LogConfig::default()
        };
        let manager = LogManager::new(false, config);
        manager.log("first", &[LogLevel::Info]);
        manager.log("hidden", &[LogLevel::Info, LogLevel::Debug]);
        manager.log("second", &[LogLevel::Error]);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
