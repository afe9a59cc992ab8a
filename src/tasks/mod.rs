// ABOUTME: Executor traits and the type-keyed registry that dispatches jobs to concrete executors
// ABOUTME: Ships the built-in Calculate and System executors; screen and input executors plug in from outside

pub mod calculate;
pub mod command;
pub mod system;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::debug;

use crate::engine::error::{ExecutionError, Result};
use crate::engine::{TaskReturn, Variables};
use crate::parser::{GlobalConfig, JobSpec, JobType, Returns};

/// What an executor hands back before return aliases are resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutput {
    pub result: String,
    pub variables: Variables,
}

/// One execution of one job. Built fresh for every dispatch.
#[async_trait]
pub trait Executor: Send {
    async fn execute(&mut self, inputs: &Variables) -> Result<TaskOutput>;
}

/// Builds executors for a single job type.
pub trait ExecutorFactory: Send + Sync {
    fn job_type(&self) -> JobType;
    fn build(&self, job: &JobSpec, globals: &GlobalConfig) -> Result<Box<dyn Executor>>;
}

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("An executor for job type '{0}' is already registered")]
    Duplicate(JobType),

    #[error("Job type '{0}' cannot have an executor")]
    NotDispatchable(JobType),

    #[error("The process-wide executor registry is already installed")]
    AlreadyInstalled,
}

static GLOBAL_REGISTRY: OnceLock<Arc<ExecutorRegistry>> = OnceLock::new();

#[derive(Default)]
pub struct ExecutorRegistry {
    factories: HashMap<JobType, Box<dyn ExecutorFactory>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            JobType::Calculate,
            Box::new(calculate::CalculateFactory),
        );
        registry
            .factories
            .insert(JobType::System, Box::new(system::SystemFactory));
        registry
    }

    /// Append a factory. The table never replaces an existing entry.
    pub fn register(
        &mut self,
        factory: Box<dyn ExecutorFactory>,
    ) -> std::result::Result<(), RegistryError> {
        let job_type = factory.job_type();
        if job_type == JobType::Overload {
            return Err(RegistryError::NotDispatchable(job_type));
        }
        if self.factories.contains_key(&job_type) {
            return Err(RegistryError::Duplicate(job_type));
        }
        self.factories.insert(job_type, factory);
        Ok(())
    }

    /// Make `registry` the process-wide table. Only the first call succeeds,
    /// and only if no run has already fallen back to the built-ins.
    pub fn install(registry: ExecutorRegistry) -> std::result::Result<(), RegistryError> {
        GLOBAL_REGISTRY
            .set(Arc::new(registry))
            .map_err(|_| RegistryError::AlreadyInstalled)
    }

    pub fn global() -> Arc<ExecutorRegistry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    pub fn supports(&self, job_type: JobType) -> bool {
        self.factories.contains_key(&job_type)
    }

    pub fn supported_types(&self) -> Vec<JobType> {
        let mut types: Vec<JobType> = self.factories.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }

    /// Build and run the executor for `job`, then resolve its declared returns.
    pub async fn execute(
        &self,
        job: &JobSpec,
        globals: &GlobalConfig,
        inputs: &Variables,
    ) -> Result<TaskReturn> {
        let job_type = job.job_type();
        let factory = self
            .factories
            .get(&job_type)
            .ok_or_else(|| ExecutionError::JobType {
                job: Some(job.name.clone()),
                job_type: job_type.to_string(),
            })?;

        debug!("Dispatching job '{}' to the {} executor", job.name, job_type);
        let mut executor = factory
            .build(job, globals)
            .map_err(|e| e.with_job(&job.name))?;
        let output = executor
            .execute(inputs)
            .await
            .map_err(|e| e.with_job(&job.name))?;

        let returns = match job.returns() {
            Some(aliases) => resolve_returns(&job.name, aliases, &output.variables)?,
            None => Variables::new(),
        };

        Ok(TaskReturn {
            job: job.name.clone(),
            result: output.result,
            returns,
            variables: output.variables,
        })
    }
}

/// Map every `alias -> source` pair onto the executor's variables.
pub fn resolve_returns(job: &str, aliases: &Returns, variables: &Variables) -> Result<Variables> {
    aliases
        .iter()
        .map(|(alias, source)| match variables.get(source) {
            Some(value) => Ok((alias.clone(), value.clone())),
            None => Err(ExecutionError::MissingRequired {
                job: Some(job.to_string()),
                field: format!("returns.{} (variable '{}')", alias, source),
            }),
        })
        .collect()
}
