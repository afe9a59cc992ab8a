// ABOUTME: System executor covering delays, log messages and external commands
// ABOUTME: Paste needs a clipboard collaborator and is rejected by the built-in executor

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::command::{self, CommandOutcome};
use super::{Executor, ExecutorFactory, TaskOutput};
use crate::engine::error::{ExecutionError, Result};
use crate::engine::Variables;
use crate::logging::{self, LogConfig};
use crate::parser::{GlobalConfig, JobKind, JobSpec, JobType, SystemAction, SystemPayload};

pub struct SystemFactory;

impl ExecutorFactory for SystemFactory {
    fn job_type(&self) -> JobType {
        JobType::System
    }

    fn build(&self, job: &JobSpec, globals: &GlobalConfig) -> Result<Box<dyn Executor>> {
        match &job.kind {
            JobKind::System(payload) => Ok(Box::new(SystemExecutor {
                job: job.name.clone(),
                payload: payload.clone(),
                debug: globals.debug,
                log_config: globals.effective_log_config(),
            })),
            _ => Err(ExecutionError::MissingRequired {
                job: Some(job.name.clone()),
                field: "system".to_string(),
            }),
        }
    }
}

pub struct SystemExecutor {
    job: String,
    payload: SystemPayload,
    debug: bool,
    log_config: LogConfig,
}

impl SystemExecutor {
    fn missing(&self, field: &str) -> ExecutionError {
        ExecutionError::MissingRequired {
            job: Some(self.job.clone()),
            field: field.to_string(),
        }
    }

    async fn run_command(&self, variables: &mut Variables) -> Result<()> {
        let config = self
            .payload
            .command
            .as_ref()
            .ok_or_else(|| self.missing("system.command"))?;
        variables.insert(
            "command".to_string(),
            Value::from(command::display_line(config)),
        );

        match command::run(&self.job, config).await? {
            CommandOutcome::Completed {
                exit_code,
                stdout,
                stderr,
            } => {
                variables.insert("exit_code".to_string(), Value::from(exit_code));
                variables.insert("stdout".to_string(), Value::from(stdout));
                variables.insert("stderr".to_string(), Value::from(stderr));
            }
            CommandOutcome::Detached { pid } => {
                variables.insert("pid".to_string(), pid.map(Value::from).unwrap_or(Value::Null));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for SystemExecutor {
    async fn execute(&mut self, _inputs: &Variables) -> Result<TaskOutput> {
        let action = self.payload.action;
        let mut variables = Variables::new();
        variables.insert("type".to_string(), Value::from(action.as_str()));

        let result = match action {
            SystemAction::Delay => {
                let duration = self.payload.duration;
                debug!("Job '{}' sleeping for {} ms", self.job, duration);
                if duration > 0 {
                    tokio::time::sleep(Duration::from_millis(duration)).await;
                }
                variables.insert("duration".to_string(), Value::from(duration));
                format!("Executed delay: {} ms", duration)
            }
            SystemAction::Log => {
                let log = self
                    .payload
                    .log
                    .as_ref()
                    .ok_or_else(|| self.missing("system.log"))?;
                logging::log(&log.message, &log.levels, self.debug, &self.log_config);
                variables.insert("message".to_string(), Value::from(log.message.clone()));
                format!("Logged message for job '{}'", self.job)
            }
            SystemAction::Command => {
                self.run_command(&mut variables).await?;
                format!("Executed command for job '{}'", self.job)
            }
            SystemAction::Paste => {
                return Err(ExecutionError::ActionType {
                    job: Some(self.job.clone()),
                    action: action.as_str().to_string(),
                })
            }
        };

        Ok(TaskOutput { result, variables })
    }
}
