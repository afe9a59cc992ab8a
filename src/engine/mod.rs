// ABOUTME: Orchestration engine for recognizer workflows
// ABOUTME: Runs jobs in sequence with attempt limits, hook jobs, branching and variable propagation

pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod result;

pub use context::RunState;
pub use error::{ExecutionError, LimitKind, Result, Severity};
pub use events::{HookPhase, RunEvent};
pub use executor::{ExecutorManager, Run};
pub use result::{RunSummary, TaskAttempt, TaskReturn, Variables};
