// ABOUTME: Error taxonomy for workflow runs, grouped into Ignorable, Critical and Crash severities
// ABOUTME: Every variant names the offending job so the run loop can report and route it

use thiserror::Error;

use crate::expression::ExpressionError;
use crate::parser::ParserError;

/// How the run loop reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Counted as a failed attempt; the run follows the failure branch.
    Ignorable,
    /// An attempt limit was reached; the run diverts to `limits.exit`.
    Critical,
    /// Structural fault; the run stops.
    Crash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    MaxCount,
    MaxFailure,
    MaxSuccess,
}

impl LimitKind {
    pub fn key(&self) -> &'static str {
        match self {
            LimitKind::MaxCount => "maxCount",
            LimitKind::MaxFailure => "maxFailure",
            LimitKind::MaxSuccess => "maxSuccess",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LimitKind::MaxCount => "attempts",
            LimitKind::MaxFailure => "failures",
            LimitKind::MaxSuccess => "successes",
        }
    }
}

fn job_name(job: &Option<String>) -> &str {
    job.as_deref().unwrap_or("<none>")
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    // Ignorable
    #[error("Job '{}' failed: {message}", job_name(.job))]
    Ignorable { job: Option<String>, message: String },

    #[error("No match found for job '{}': {message}", job_name(.job))]
    MatchNotFound { job: Option<String>, message: String },

    #[error("Command '{command}' in job '{}' exited with status {code}: {stderr}", job_name(.job))]
    CommandFailed {
        job: Option<String>,
        command: String,
        code: i32,
        stderr: String,
    },

    // Critical
    #[error("Task '{}' exceeded {}: {limit} {}", job_name(.job), .kind.key(), .kind.label())]
    Retry {
        job: Option<String>,
        kind: LimitKind,
        limit: i64,
    },

    // Crash
    #[error("Workflow begin job is not set or not defined: '{begin}'")]
    WorkflowBegin { job: Option<String>, begin: String },

    #[error("Unknown job type '{job_type}' for job '{}'", job_name(.job))]
    JobType { job: Option<String>, job_type: String },

    #[error("Job '{name}' not found in workflow (referenced by '{}')", job_name(.job))]
    JobNotFound { job: Option<String>, name: String },

    #[error("Job '{}' overloads unknown job '{target}'", job_name(.job))]
    Overload { job: Option<String>, target: String },

    #[error("Recursive reference in job '{}': {}", job_name(.job), .chain.join(" -> "))]
    Recursive { job: Option<String>, chain: Vec<String> },

    #[error(
        "Not all needed tasks are completed for job '{}'. Missing: {missing:?}. Available results: {available:?}",
        job_name(.job)
    )]
    Needed {
        job: Option<String>,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Job '{}' is missing required value '{field}'", job_name(.job))]
    MissingRequired { job: Option<String>, field: String },

    #[error("Invalid job '{}': {reason}", job_name(.job))]
    InvalidJob { job: Option<String>, reason: String },

    #[error("Before job '{hook}' of '{}' failed: {source}", job_name(.job))]
    BeforeJobRun {
        job: Option<String>,
        hook: String,
        source: Box<ExecutionError>,
    },

    #[error("After job '{hook}' of '{}' failed: {source}", job_name(.job))]
    AfterJobRun {
        job: Option<String>,
        hook: String,
        source: Box<ExecutionError>,
    },

    #[error("Action '{action}' is not supported for job '{}'", job_name(.job))]
    ActionType { job: Option<String>, action: String },

    #[error("Failed to run command '{command}' for job '{}': {message}", job_name(.job))]
    Command {
        job: Option<String>,
        command: String,
        message: String,
    },

    #[error("Calculation failed in job '{}': {source}", job_name(.job))]
    Calculate {
        job: Option<String>,
        #[source]
        source: ExpressionError,
    },

    #[error("Precondition not met for job '{}': {message}", job_name(.job))]
    Precondition { job: Option<String>, message: String },

    #[error("Run aborted at job '{}': {reason}", job_name(.job))]
    Aborted { job: Option<String>, reason: String },

    #[error("Workflow error: {source}")]
    Parser {
        job: Option<String>,
        #[source]
        source: ParserError,
    },
}

impl ExecutionError {
    pub fn severity(&self) -> Severity {
        match self {
            ExecutionError::Ignorable { .. }
            | ExecutionError::MatchNotFound { .. }
            | ExecutionError::CommandFailed { .. } => Severity::Ignorable,
            ExecutionError::Retry { .. } => Severity::Critical,
            _ => Severity::Crash,
        }
    }

    pub fn is_ignorable(&self) -> bool {
        self.severity() == Severity::Ignorable
    }

    pub fn job(&self) -> Option<&str> {
        self.job_slot_ref().as_deref()
    }

    /// Attach `name` as the offending job unless one is already recorded.
    pub fn with_job(mut self, name: &str) -> Self {
        let slot = self.job_slot();
        if slot.is_none() {
            *slot = Some(name.to_string());
        }
        self
    }

    fn job_slot_ref(&self) -> &Option<String> {
        match self {
            ExecutionError::Ignorable { job, .. }
            | ExecutionError::MatchNotFound { job, .. }
            | ExecutionError::CommandFailed { job, .. }
            | ExecutionError::Retry { job, .. }
            | ExecutionError::WorkflowBegin { job, .. }
            | ExecutionError::JobType { job, .. }
            | ExecutionError::JobNotFound { job, .. }
            | ExecutionError::Overload { job, .. }
            | ExecutionError::Recursive { job, .. }
            | ExecutionError::Needed { job, .. }
            | ExecutionError::MissingRequired { job, .. }
            | ExecutionError::InvalidJob { job, .. }
            | ExecutionError::BeforeJobRun { job, .. }
            | ExecutionError::AfterJobRun { job, .. }
            | ExecutionError::ActionType { job, .. }
            | ExecutionError::Command { job, .. }
            | ExecutionError::Calculate { job, .. }
            | ExecutionError::Precondition { job, .. }
            | ExecutionError::Aborted { job, .. }
            | ExecutionError::Parser { job, .. } => job,
        }
    }

    fn job_slot(&mut self) -> &mut Option<String> {
        match self {
            ExecutionError::Ignorable { job, .. }
            | ExecutionError::MatchNotFound { job, .. }
            | ExecutionError::CommandFailed { job, .. }
            | ExecutionError::Retry { job, .. }
            | ExecutionError::WorkflowBegin { job, .. }
            | ExecutionError::JobType { job, .. }
            | ExecutionError::JobNotFound { job, .. }
            | ExecutionError::Overload { job, .. }
            | ExecutionError::Recursive { job, .. }
            | ExecutionError::Needed { job, .. }
            | ExecutionError::MissingRequired { job, .. }
            | ExecutionError::InvalidJob { job, .. }
            | ExecutionError::BeforeJobRun { job, .. }
            | ExecutionError::AfterJobRun { job, .. }
            | ExecutionError::ActionType { job, .. }
            | ExecutionError::Command { job, .. }
            | ExecutionError::Calculate { job, .. }
            | ExecutionError::Precondition { job, .. }
            | ExecutionError::Aborted { job, .. }
            | ExecutionError::Parser { job, .. } => job,
        }
    }
}

impl From<ParserError> for ExecutionError {
    fn from(error: ParserError) -> Self {
        match error {
            ParserError::BeginMissing(begin) => ExecutionError::WorkflowBegin { job: None, begin },
            ParserError::MissingField { job, field } => ExecutionError::MissingRequired {
                job: Some(job),
                field,
            },
            ParserError::InvalidJob { job, reason } => ExecutionError::InvalidJob {
                job: Some(job),
                reason,
            },
            ParserError::OverloadTarget { job, target } => ExecutionError::Overload {
                job: Some(job),
                target,
            },
            ParserError::RecursiveOverload { job, chain } => ExecutionError::Recursive {
                job: Some(job),
                chain,
            },
            other => ExecutionError::Parser {
                job: None,
                source: other,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
