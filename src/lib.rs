// ABOUTME: Main library module for the recognizer automation engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod expression;
pub mod logging;
pub mod parser;
pub mod tasks;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{ExecutionError, ExecutorManager, Run, RunSummary, Severity, TaskReturn};
pub use expression::{calculate, ExpressionError};
pub use logging::{LogLevel, LogManager};
pub use parser::{GlobalConfig, JobSpec, JobType, Workflow, WorkflowManager, WorkflowParser};
pub use tasks::{Executor, ExecutorFactory, ExecutorRegistry, TaskOutput};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
