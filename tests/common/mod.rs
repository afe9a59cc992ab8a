// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Builds workflow JSON documents, temp environments and scripted mock executors

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::fs;

use recognizer::engine::{ExecutionError, ExecutorManager, Result, Variables};
use recognizer::parser::{GlobalConfig, JobSpec, JobType, WorkflowManager};
use recognizer::tasks::{Executor, ExecutorFactory, ExecutorRegistry, TaskOutput};

pub struct TestWorkflowBuilder {
    begin: String,
    globals: Map<String, Value>,
    jobs: Map<String, Value>,
}

impl TestWorkflowBuilder {
    pub fn new(begin: &str) -> Self {
        Self {
            begin: begin.to_string(),
            globals: Map::new(),
            jobs: Map::new(),
        }
    }

    pub fn with_global(mut self, key: &str, value: Value) -> Self {
        self.globals.insert(key.to_string(), value);
        self
    }

    /// Add a raw job definition.
    pub fn with_job(mut self, name: &str, job: Value) -> Self {
        self.jobs.insert(name.to_string(), job);
        self
    }

    pub fn add_calculate(self, name: &str, expressions: Value, returns: Value) -> Self {
        self.with_job(
            name,
            json!({
                "type": "Calculate",
                "calculate": {"expressions": expressions, "returns": returns}
            }),
        )
    }

    pub fn add_log(self, name: &str, message: &str) -> Self {
        self.with_job(
            name,
            json!({
                "type": "System",
                "system": {"type": "Log", "log": {"message": message, "levels": ["INFO"]}}
            }),
        )
    }

    pub fn add_command(self, name: &str, command: &str) -> Self {
        self.with_job(
            name,
            json!({
                "type": "System",
                "system": {"type": "Command", "command": {"command": command}}
            }),
        )
    }

    /// An OCR job, served by `Script` executors in tests.
    pub fn add_scripted(self, name: &str, extra: Value) -> Self {
        let mut job = json!({"type": "OCR", "ocr": {"returns": {"value": "value"}}});
        if let (Some(target), Value::Object(fields)) = (job.as_object_mut(), extra) {
            target.extend(fields);
        }
        self.with_job(name, job)
    }

    pub fn to_value(&self) -> Value {
        json!({
            "begin": self.begin,
            "globals": Value::Object(self.globals.clone()),
            "jobs": Value::Object(self.jobs.clone()),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).expect("workflow serializes")
    }

    pub fn manager(&self) -> WorkflowManager {
        WorkflowManager::from_json(&self.to_json()).expect("workflow parses")
    }

    pub async fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.to_json()).await
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workflow_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.json", name))
    }

    pub async fn create_workflow_file(&self, name: &str, builder: &TestWorkflowBuilder) -> PathBuf {
        let workflow_file = self.workflow_file(name);
        builder
            .write_to_file(&workflow_file)
            .await
            .expect("Failed to write workflow file");
        workflow_file
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Succeed,
    Fail,
    Crash,
}

/// Scripted outcomes per job name, shared by every executor a factory builds.
/// Jobs without a plan succeed unless marked as always failing.
#[derive(Clone, Default)]
pub struct Script {
    plans: Arc<Mutex<HashMap<String, VecDeque<Outcome>>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, job: &str, outcomes: &[Outcome]) {
        self.plans
            .lock()
            .unwrap()
            .insert(job.to_string(), outcomes.iter().copied().collect());
    }

    pub fn always_fail(&self, job: &str) {
        self.failing.lock().unwrap().insert(job.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_outcome(&self, job: &str) -> Outcome {
        self.calls.lock().unwrap().push(job.to_string());
        if self.failing.lock().unwrap().contains(job) {
            return Outcome::Fail;
        }
        self.plans
            .lock()
            .unwrap()
            .get_mut(job)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Outcome::Succeed)
    }

    /// Built-ins plus this script serving OCR jobs.
    pub fn registry(&self) -> Arc<ExecutorRegistry> {
        let mut registry = ExecutorRegistry::with_builtins();
        registry
            .register(Box::new(ScriptedFactory {
                script: self.clone(),
            }))
            .expect("OCR is not a built-in");
        Arc::new(registry)
    }

    pub fn executor_manager(&self, builder: &TestWorkflowBuilder) -> ExecutorManager {
        ExecutorManager::with_registry(builder.manager(), self.registry())
    }
}

struct ScriptedFactory {
    script: Script,
}

impl ExecutorFactory for ScriptedFactory {
    fn job_type(&self) -> JobType {
        JobType::Ocr
    }

    fn build(&self, job: &JobSpec, _globals: &GlobalConfig) -> Result<Box<dyn Executor>> {
        Ok(Box::new(ScriptedExecutor {
            job: job.name.clone(),
            script: self.script.clone(),
        }))
    }
}

struct ScriptedExecutor {
    job: String,
    script: Script,
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&mut self, inputs: &Variables) -> Result<TaskOutput> {
        match self.script.next_outcome(&self.job) {
            Outcome::Succeed => {
                let mut variables = inputs.clone();
                variables.insert("value".to_string(), json!(self.script.calls().len()));
                Ok(TaskOutput {
                    result: format!("{} recognized", self.job),
                    variables,
                })
            }
            Outcome::Fail => Err(ExecutionError::MatchNotFound {
                job: Some(self.job.clone()),
                message: "nothing on screen".to_string(),
            }),
            Outcome::Crash => Err(ExecutionError::Precondition {
                job: Some(self.job.clone()),
                message: "window not found".to_string(),
            }),
        }
    }
}
