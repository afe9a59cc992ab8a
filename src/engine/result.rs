// ABOUTME: Result types produced by a workflow run: per-job returns, attempt counters and the run summary
// ABOUTME: Variables are JSON values keyed by name so jobs can hand numbers and text to each other

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named values computed or consumed by a job.
pub type Variables = IndexMap<String, Value>;

/// Success and failure counters for one job, cumulative for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAttempt {
    pub success: u32,
    pub failure: u32,
}

impl TaskAttempt {
    pub fn total(&self) -> u32 {
        self.success + self.failure
    }
}

/// Output of one successful job execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReturn {
    pub job: String,
    pub result: String,
    /// Declared public outputs, alias -> value.
    pub returns: Variables,
    /// Everything the executor computed.
    pub variables: Variables,
}

impl TaskReturn {
    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.returns.get(alias)
    }

    pub fn get_f64(&self, alias: &str) -> Option<f64> {
        self.returns.get(alias).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub work_chain: Vec<String>,
    /// Main-job results in the order they were produced.
    pub results: Vec<TaskReturn>,
    pub attempts: IndexMap<String, TaskAttempt>,
    pub crashed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn result_for(&self, job: &str) -> Option<&TaskReturn> {
        self.results.iter().rev().find(|r| r.job == job)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
