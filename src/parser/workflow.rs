// ABOUTME: Workflow document structure, global settings and JSON parsing
// ABOUTME: Jobs are kept as raw JSON so overload inheritance can merge undeclared fields

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::fs;

use super::error::{ParserError, Result};
use crate::logging::{LogConfig, LogLevel};

fn default_colorful() -> bool {
    true
}

/// Settings shared by every job of a workflow (`globals` in the document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_colorful")]
    pub colorful: bool,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub log_config: LogConfig,
    /// Keys this engine does not interpret, kept for executors that do.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug: false,
            colorful: true,
            ignore: false,
            log_level: None,
            log_config: LogConfig::default(),
            extra: IndexMap::new(),
        }
    }
}

impl GlobalConfig {
    /// `logConfig` with its threshold replaced by `logLevel` when that is set.
    pub fn effective_log_config(&self) -> LogConfig {
        let mut config = self.log_config.clone();
        if let Some(level) = self.log_level {
            config.level = level;
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub begin: String,
    #[serde(default)]
    pub globals: GlobalConfig,
    pub jobs: IndexMap<String, Value>,
}

impl Workflow {
    /// Parse workflow from a `.json` file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        WorkflowParser::new().parse_file(path).await
    }

    /// Parse workflow from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let workflow: Workflow = serde_json::from_str(content)?;
        workflow.validate_structure()?;
        Ok(workflow)
    }

    /// Every job entry must be an object carrying a string `type`.
    fn validate_structure(&self) -> Result<()> {
        for (name, job) in &self.jobs {
            let Some(object) = job.as_object() else {
                return Err(ParserError::InvalidJob {
                    job: name.clone(),
                    reason: "job definition must be an object".to_string(),
                });
            };
            if !object.get("type").is_some_and(Value::is_string) {
                return Err(ParserError::MissingField {
                    job: name.clone(),
                    field: "type".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.keys().cloned().collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn ensure_json_extension(path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(())
    } else {
        Err(ParserError::InvalidFormat(format!(
            "workflow file must have a .json extension: {}",
            path.display()
        )))
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowParser;

impl WorkflowParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Workflow> {
        let path = path.as_ref();
        ensure_json_extension(path)?;
        let content = fs::read_to_string(path).await?;
        self.parse_string(&content)
    }

    pub fn parse_string(&self, content: &str) -> Result<Workflow> {
        Workflow::from_json(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_parse_basic_workflow() {
        let json = r#"{
            "begin": "start",
            "globals": {"debug": true, "logLevel": "INFO", "custom": 7},
            "jobs": {
                "start": {"type": "System", "system": {"type": "Delay", "duration": 0}},
                "finish": {"type": "Calculate", "calculate": {"expressions": {"x": 1}}}
            }
        }"#;

        let workflow = Workflow::from_json(json).unwrap();
        assert_eq!(workflow.begin, "start");
        assert_eq!(workflow.job_names(), vec!["start", "finish"]);
        assert!(workflow.globals.debug);
        assert!(workflow.globals.colorful);
        assert_eq!(workflow.globals.extra["custom"], 7);
        assert_eq!(
            workflow.globals.effective_log_config().level,
            LogLevel::Info
        );
    }

    #[test]
    fn test_globals_default_when_absent() {
        let workflow = Workflow::from_json(r#"{"begin": "a", "jobs": {}}"#).unwrap();
        assert_eq!(workflow.globals, GlobalConfig::default());
        assert_eq!(workflow.globals.effective_log_config(), LogConfig::default());
    }

    #[test]
    fn test_job_without_type_is_rejected() {
        let result = Workflow::from_json(r#"{"begin": "a", "jobs": {"a": {"next": ""}}}"#);
        assert!(matches!(
            result,
            Err(ParserError::MissingField { ref field, .. }) if field == "type"
        ));

        let result = Workflow::from_json(r#"{"begin": "a", "jobs": {"a": 3}}"#);
        assert!(matches!(result, Err(ParserError::InvalidJob { .. })));
    }

    #[tokio::test]
    async fn test_file_must_be_json() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"{}").unwrap();
        assert!(matches!(
            Workflow::from_file(file.path()).await,
            Err(ParserError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_parser_reads_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"begin": "a", "jobs": {"a": {"type": "OCR"}}}"#)
            .unwrap();

        let workflow = WorkflowParser::new().parse_file(file.path()).await.unwrap();
        assert_eq!(workflow.begin, "a");
    }
}
