// ABOUTME: Job definition store that resolves overload inheritance and answers branch lookups
// ABOUTME: Owns the resolved-job cache and the per-document overload history used for cycle detection

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::error::{ParserError, Result};
use super::job::JobSpec;
use super::overload::merge_job;
use super::workflow::{GlobalConfig, Workflow};

const OVERLOAD_TYPE: &str = "Overload";

#[derive(Debug, Clone)]
pub struct WorkflowManager {
    workflow: Workflow,
    resolved: HashMap<String, Arc<JobSpec>>,
    /// Last overload target recorded for each job name.
    history: HashMap<String, String>,
}

impl WorkflowManager {
    pub fn from_workflow(workflow: Workflow) -> Self {
        Self {
            workflow,
            resolved: HashMap::new(),
            history: HashMap::new(),
        }
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_workflow(Workflow::from_file(path).await?))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(Self::from_workflow(Workflow::from_json(content)?))
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn globals(&self) -> &GlobalConfig {
        &self.workflow.globals
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workflow.jobs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workflow.jobs.keys().map(String::as_str)
    }

    pub fn get_begin(&self) -> Result<String> {
        let begin = &self.workflow.begin;
        if begin.is_empty() || !self.contains(begin) {
            return Err(ParserError::BeginMissing(begin.clone()));
        }
        Ok(begin.clone())
    }

    /// Look up a job with its overload chain merged in. `Ok(None)` when the
    /// name is not defined.
    pub fn get_job(&mut self, name: &str) -> Result<Option<Arc<JobSpec>>> {
        if let Some(job) = self.resolved.get(name) {
            return Ok(Some(Arc::clone(job)));
        }
        let Some(raw) = self.workflow.jobs.get(name).cloned() else {
            return Ok(None);
        };

        let merged = self.resolve_overloads(name, raw)?;
        let job = Arc::new(JobSpec::from_value(name, &merged)?);
        self.resolved.insert(name.to_string(), Arc::clone(&job));
        Ok(Some(job))
    }

    /// Next job name for an outcome, or `None` when the run should stop.
    pub fn get_next(&mut self, name: &str, succeeded: bool) -> Result<Option<String>> {
        Ok(self
            .get_job(name)?
            .and_then(|job| job.next.target(succeeded).map(str::to_string)))
    }

    /// Resolve every job once, failing on the first broken definition.
    pub fn resolve_all(&mut self) -> Result<Vec<Arc<JobSpec>>> {
        let names = self.workflow.job_names();
        let mut jobs = Vec::with_capacity(names.len());
        for name in names {
            if let Some(job) = self.get_job(&name)? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    fn resolve_overloads(&mut self, name: &str, raw: Value) -> Result<Value> {
        let mut merged = raw;
        let mut link = name.to_string();

        while type_of(&link, &merged)? == OVERLOAD_TYPE {
            let target = merged
                .get("overload")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if target.is_empty() {
                return Err(ParserError::MissingField {
                    job: link,
                    field: "overload".to_string(),
                });
            }

            self.record_overload(name, &link, &target)?;

            let base = self.workflow.jobs.get(&target).ok_or_else(|| {
                ParserError::OverloadTarget {
                    job: link.clone(),
                    target: target.clone(),
                }
            })?;
            debug!("Job '{}' inherits from '{}'", link, target);
            merged = merge_job(base, &merged);
            link = target;
        }

        Ok(merged)
    }

    /// Record `link -> target` and walk the recorded chain from `link`,
    /// failing as soon as any name repeats.
    fn record_overload(&mut self, job: &str, link: &str, target: &str) -> Result<()> {
        self.history.insert(link.to_string(), target.to_string());

        let mut chain = vec![link.to_string()];
        let mut seen: HashSet<&str> = HashSet::from([link]);
        let mut current = target;
        loop {
            chain.push(current.to_string());
            if !seen.insert(current) {
                return Err(ParserError::RecursiveOverload {
                    job: job.to_string(),
                    chain,
                });
            }
            match self.history.get(current) {
                Some(next) => current = next.as_str(),
                None => return Ok(()),
            }
        }
    }
}

fn type_of<'a>(name: &str, job: &'a Value) -> Result<&'a str> {
    job.get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ParserError::MissingField {
            job: name.to_string(),
            field: "type".to_string(),
        })
}

impl From<Workflow> for WorkflowManager {
    fn from(workflow: Workflow) -> Self {
        Self::from_workflow(workflow)
    }
}
