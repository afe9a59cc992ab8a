// ABOUTME: Parser module for JSON workflow documents
// ABOUTME: Exports the document types, job payloads, overload merging and the job definition store

pub mod error;
pub mod job;
pub mod manager;
pub mod overload;
pub mod payload;
pub mod workflow;

pub use error::{ParserError, Result};
pub use job::{After, Before, Delay, JobKind, JobSpec, JobType, Limits, Next, UNBOUNDED};
pub use manager::WorkflowManager;
pub use overload::{deep_merge, merge_job};
pub use payload::{
    CalculatePayload, InputPayload, OcrPayload, Returns, RoiPayload, SystemAction,
    SystemCommand, SystemLog, SystemPayload,
};
pub use workflow::{GlobalConfig, Workflow, WorkflowParser};
