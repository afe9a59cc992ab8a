// ABOUTME: Error types for arithmetic expression scanning and evaluation
// ABOUTME: Every failure carries enough context to point at the offending input

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Invalid character '{ch}' at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Unbalanced parenthesis starting at position {0}")]
    UnbalancedParenthesis(usize),

    #[error("Malformed function call '{0}'")]
    MalformedFunction(String),

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{name}' does not accept {given} argument(s)")]
    WrongArity { name: String, given: usize },

    #[error("Math domain error in '{0}'")]
    Domain(String),

    #[error("Division by zero in operator '{0}'")]
    DivisionByZero(&'static str),

    #[error("Numerical result out of range in '{0}'")]
    Overflow(String),

    #[error("Malformed expression '{0}'")]
    Malformed(String),

    #[error("Circular reference between expressions: {0}")]
    CircularReference(String),

    #[error("Expression nesting exceeds {0} levels")]
    TooDeep(usize),
}

pub type Result<T> = std::result::Result<T, ExpressionError>;
