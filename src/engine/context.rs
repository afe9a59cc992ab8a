// ABOUTME: Mutable state of a single run: attempts, results, propagated returns and the work chain
// ABOUTME: Enforces attempt limits and `needs` before a job is allowed to execute

use indexmap::IndexMap;
use std::collections::HashMap;

use super::error::{ExecutionError, LimitKind, Result};
use super::result::{TaskAttempt, TaskReturn, Variables};
use crate::parser::{JobSpec, UNBOUNDED};

#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub current: Option<String>,
    attempts: IndexMap<String, TaskAttempt>,
    /// Latest result per job name, main and hook jobs alike.
    results: IndexMap<String, TaskReturn>,
    propagated: HashMap<String, Variables>,
    /// Main-job results in production order.
    history: Vec<TaskReturn>,
    work_chain: Vec<String>,
    pub crashed: bool,
}

impl RunState {
    pub fn new(begin: String) -> Self {
        Self {
            current: Some(begin),
            ..Self::default()
        }
    }

    pub fn attempts(&self, job: &str) -> TaskAttempt {
        self.attempts.get(job).copied().unwrap_or_default()
    }

    pub fn all_attempts(&self) -> &IndexMap<String, TaskAttempt> {
        &self.attempts
    }

    pub fn result(&self, job: &str) -> Option<&TaskReturn> {
        self.results.get(job)
    }

    pub fn propagated(&self, job: &str) -> Option<&Variables> {
        self.propagated.get(job)
    }

    pub fn history(&self) -> &[TaskReturn] {
        &self.history
    }

    pub fn work_chain(&self) -> &[String] {
        &self.work_chain
    }

    /// Names of every job with a recorded result, in first-completion order.
    pub fn completed_jobs(&self) -> Vec<String> {
        self.results.keys().cloned().collect()
    }

    /// Fails with a critical `Retry` when any configured limit is already reached.
    pub fn check_limits(&self, job: &JobSpec) -> Result<()> {
        let attempts = self.attempts(&job.name);
        let checks = [
            (LimitKind::MaxCount, job.limits.max_count, attempts.total()),
            (LimitKind::MaxFailure, job.limits.max_failure, attempts.failure),
            (LimitKind::MaxSuccess, job.limits.max_success, attempts.success),
        ];
        for (kind, limit, value) in checks {
            if limit != UNBOUNDED && i64::from(value) >= limit {
                return Err(ExecutionError::Retry {
                    job: Some(job.name.clone()),
                    kind,
                    limit,
                });
            }
        }
        Ok(())
    }

    pub fn check_needed(&self, job: &JobSpec) -> Result<()> {
        let missing: Vec<String> = job
            .needs
            .iter()
            .filter(|name| !self.results.contains_key(name.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(ExecutionError::Needed {
            job: Some(job.name.clone()),
            missing,
            available: self.completed_jobs(),
        })
    }

    pub fn record_success(&mut self, result: TaskReturn) {
        let name = result.job.clone();
        self.attempts.entry(name.clone()).or_default().success += 1;
        self.work_chain.push(name);
        self.history.push(result.clone());
        self.store(result);
    }

    pub fn record_failure(&mut self, job: &str) {
        self.attempts.entry(job.to_string()).or_default().failure += 1;
    }

    /// Hook results are visible to `needs` and `use` but are not attempts.
    pub fn record_hook(&mut self, result: TaskReturn) {
        self.store(result);
    }

    fn store(&mut self, result: TaskReturn) {
        self.propagated
            .insert(result.job.clone(), result.returns.clone());
        self.results.insert(result.job.clone(), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(value: serde_json::Value) -> JobSpec {
        JobSpec::from_value("job", &value).unwrap()
    }

    fn task_return(name: &str) -> TaskReturn {
        TaskReturn {
            job: name.to_string(),
            result: "ok".to_string(),
            returns: [("out".to_string(), json!(1.0))].into_iter().collect(),
            variables: Variables::new(),
        }
    }

    #[test]
    fn test_limits_block_before_execution() {
        let spec = job(json!({
            "type": "OCR",
            "limits": {"maxCount": 2, "maxSuccess": 1}
        }));
        let mut state = RunState::new("job".to_string());
        assert!(state.check_limits(&spec).is_ok());

        state.record_success(task_return("job"));
        match state.check_limits(&spec) {
            Err(ExecutionError::Retry { kind, limit, .. }) => {
                assert_eq!(kind, LimitKind::MaxSuccess);
                assert_eq!(limit, 1);
            }
            other => panic!("expected retry, got {:?}", other),
        }
    }

    #[test]
    fn test_max_failure() {
        let spec = job(json!({"type": "OCR", "limits": {"maxFailure": 1}}));
        let mut state = RunState::new("job".to_string());
        state.record_failure("job");
        assert!(matches!(
            state.check_limits(&spec),
            Err(ExecutionError::Retry {
                kind: LimitKind::MaxFailure,
                ..
            })
        ));
        assert_eq!(state.attempts("job").total(), 1);
    }

    #[test]
    fn test_needs() {
        let spec = job(json!({"type": "OCR", "needs": ["a", "b"]}));
        let mut state = RunState::new("job".to_string());
        state.record_hook(task_return("a"));

        match state.check_needed(&spec) {
            Err(ExecutionError::Needed { missing, available, .. }) => {
                assert_eq!(missing, vec!["b"]);
                assert_eq!(available, vec!["a"]);
            }
            other => panic!("expected needed error, got {:?}", other),
        }

        state.record_success(task_return("b"));
        assert!(state.check_needed(&spec).is_ok());
        assert_eq!(state.work_chain().to_vec(), vec!["b".to_string()]);
        assert_eq!(state.propagated("a").unwrap()["out"], json!(1.0));
    }
}
