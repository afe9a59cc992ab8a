// ABOUTME: Main application orchestration for the recognizer CLI
// ABOUTME: Loads the workflow, installs tracing and dispatches to the run or check command

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Config};
use crate::parser::{Workflow, WorkflowParser};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level = if verbose {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        match self.config.logging.format.as_str() {
            "compact" => {
                tracing_subscriber::fmt()
                    .compact()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .init();
            }
            _ => {
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .init();
            }
        }

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Load the workflow with the app config's overrides applied.
    pub async fn load_workflow(&self, args: &Args) -> Result<Workflow> {
        let mut workflow = WorkflowParser::new()
            .parse_file(&args.input)
            .await
            .with_context(|| format!("Failed to load workflow {}", args.input.display()))?;
        if let Some(debug) = self.config.debug {
            workflow.globals.debug = debug;
        }
        Ok(workflow)
    }

    /// Run the application with parsed arguments
    pub async fn run(&mut self, args: Args) -> Result<()> {
        let workflow = self.load_workflow(&args).await?;
        self.init_logging(args.verbose, args.no_color || !workflow.globals.colorful)?;

        info!("Starting recognizer v{}", crate::VERSION);
        debug!("Configuration loaded from: {:?}", args.config);

        if args.check {
            commands::check_workflow(workflow)
        } else {
            commands::run_workflow(workflow, args.await_all, args.verbose).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_config_debug_overrides_globals() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("flow.json");
        fs::write(
            &path,
            r#"{"begin": "a", "globals": {"debug": false}, "jobs": {"a": {"type": "OCR"}}}"#,
        )
        .unwrap();

        let app = App::new(Config {
            debug: Some(true),
            ..Config::default()
        });
        let args = Args::try_parse_from(["recognizer", path.to_str().unwrap()]).unwrap();
        let workflow = app.load_workflow(&args).await.unwrap();
        assert!(workflow.globals.debug);
    }

    #[tokio::test]
    async fn test_rejects_non_json_input() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("flow.yaml");
        fs::write(&path, "begin: a").unwrap();

        let app = App::new(Config::default());
        let args = Args::try_parse_from(["recognizer", path.to_str().unwrap()]).unwrap();
        assert!(app.load_workflow(&args).await.is_err());
    }
}
