// ABOUTME: Arithmetic expression evaluator used by Calculate jobs
// ABOUTME: Exports the scanner, evaluator, function table, and expression error types

pub mod error;
pub mod evaluator;
pub mod functions;
pub mod scanner;

pub use error::{ExpressionError, Result};
pub use evaluator::{calculate, Evaluator, Expression, MAX_DEPTH};
pub use scanner::{Operator, Scanner, Token};
