// ABOUTME: Error types for workflow document loading and job resolution
// ABOUTME: Covers I/O and JSON failures, malformed jobs and overload chain problems

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read workflow file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid workflow format: {0}")]
    InvalidFormat(String),

    #[error("Invalid job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },

    #[error("Job '{job}' is missing required field '{field}'")]
    MissingField { job: String, field: String },

    #[error("Workflow begin job is not set or not defined: '{0}'")]
    BeginMissing(String),

    #[error("Job '{job}' overloads unknown job '{target}'")]
    OverloadTarget { job: String, target: String },

    #[error("Recursive overload detected for job '{job}': {}", chain.join(" -> "))]
    RecursiveOverload { job: String, chain: Vec<String> },
}

pub type Result<T> = std::result::Result<T, ParserError>;
