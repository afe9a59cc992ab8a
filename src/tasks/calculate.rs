// ABOUTME: Calculate executor evaluating named arithmetic expressions with seeded variables
// ABOUTME: Seeds come from the payload's variables and then from numeric values of the `use` inputs

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::{Executor, ExecutorFactory, TaskOutput};
use crate::engine::error::{ExecutionError, Result};
use crate::engine::Variables;
use crate::expression;
use crate::parser::{CalculatePayload, GlobalConfig, JobKind, JobSpec, JobType};

pub struct CalculateFactory;

impl ExecutorFactory for CalculateFactory {
    fn job_type(&self) -> JobType {
        JobType::Calculate
    }

    fn build(&self, job: &JobSpec, _globals: &GlobalConfig) -> Result<Box<dyn Executor>> {
        match &job.kind {
            JobKind::Calculate(payload) => Ok(Box::new(CalculateExecutor {
                job: job.name.clone(),
                payload: payload.clone(),
            })),
            _ => Err(ExecutionError::MissingRequired {
                job: Some(job.name.clone()),
                field: "calculate".to_string(),
            }),
        }
    }
}

pub struct CalculateExecutor {
    job: String,
    payload: CalculatePayload,
}

impl CalculateExecutor {
    fn seeds(&self, inputs: &Variables) -> IndexMap<String, f64> {
        let mut seeds = self.payload.variables.clone();
        for (name, value) in inputs {
            match numeric(value) {
                Some(number) => {
                    seeds.insert(name.clone(), number);
                }
                None => debug!(
                    "Job '{}' skips non-numeric input '{}': {}",
                    self.job, name, value
                ),
            }
        }
        seeds
    }
}

#[async_trait]
impl Executor for CalculateExecutor {
    async fn execute(&mut self, inputs: &Variables) -> Result<TaskOutput> {
        let seeds = self.seeds(inputs);
        let values = expression::calculate(&self.payload.expressions, seeds).map_err(|source| {
            ExecutionError::Calculate {
                job: Some(self.job.clone()),
                source,
            }
        })?;
        debug!("Calculated values for '{}': {:?}", self.job, values);

        Ok(TaskOutput {
            result: format!(
                "Calculate executed successfully, vars: {}",
                format_values(&values)
            ),
            variables: values
                .into_iter()
                .map(|(name, value)| (name, Value::from(value)))
                .collect(),
        })
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let number: f64 = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn format_values(values: &IndexMap<String, f64>) -> String {
    let pairs: Vec<String> = values
        .iter()
        .map(|(name, value)| format!("'{}': {}", name, value))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}
