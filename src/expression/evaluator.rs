// ABOUTME: Precedence-climbing evaluator that turns scanned tokens into postfix and reduces them
// ABOUTME: Resolves variables lazily from the expression table and memoizes every resolved value

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{ExpressionError, Result};
use super::functions;
use super::scanner::{Operator, Scanner, Token};

/// Maximum nesting of groups, function arguments and variable references.
pub const MAX_DEPTH: usize = 512;

/// A named entry of a Calculate job: either a literal number or an expression
/// string that may reference other entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expression {
    Number(f64),
    Text(String),
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Number(value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
enum PostfixItem {
    Value(f64),
    Op(Operator),
}

pub struct Evaluator<'a> {
    expressions: &'a IndexMap<String, Expression>,
    known: IndexMap<String, f64>,
    /// Names whose expressions are currently being evaluated, outermost first.
    resolving: Vec<String>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(expressions: &'a IndexMap<String, Expression>, known: IndexMap<String, f64>) -> Self {
        Self {
            expressions,
            known,
            resolving: Vec::new(),
            depth: 0,
        }
    }

    pub fn known(&self) -> &IndexMap<String, f64> {
        &self.known
    }

    pub fn into_known(self) -> IndexMap<String, f64> {
        self.known
    }

    pub fn assign(&mut self, name: &str, value: f64) {
        self.known.insert(name.to_string(), value);
    }

    /// Evaluate a single expression string against the current table.
    pub fn evaluate(&mut self, source: &str) -> Result<f64> {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = self.evaluate_inner(source);
        self.depth -= 1;
        result
    }

    fn evaluate_inner(&mut self, source: &str) -> Result<f64> {
        let mut postfix: Vec<PostfixItem> = Vec::new();
        let mut operators: Vec<Operator> = Vec::new();

        for token in Scanner::new(source) {
            match token? {
                Token::Number(value) => postfix.push(PostfixItem::Value(value)),
                Token::Variable(name) => {
                    let value = self.resolve(&name)?;
                    postfix.push(PostfixItem::Value(value));
                }
                Token::Group(inner) => {
                    let value = self.evaluate(&inner)?;
                    postfix.push(PostfixItem::Value(value));
                }
                Token::Function { name, args } => {
                    if !functions::is_supported(&name) {
                        return Err(ExpressionError::UnknownFunction(name));
                    }
                    let values = args
                        .iter()
                        .map(|arg| self.evaluate(arg))
                        .collect::<Result<Vec<_>>>()?;
                    postfix.push(PostfixItem::Value(functions::call(&name, &values)?));
                }
                Token::Operator(op) => {
                    // Pops on ties, so every operator including ** groups left to right.
                    while let Some(top) = operators.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        postfix.push(PostfixItem::Op(*top));
                        operators.pop();
                    }
                    operators.push(op);
                }
            }
        }
        while let Some(op) = operators.pop() {
            postfix.push(PostfixItem::Op(op));
        }

        reduce(source, &postfix)
    }

    fn resolve(&mut self, name: &str) -> Result<f64> {
        if let Some(value) = self.known.get(name) {
            return Ok(*value);
        }

        let expressions = self.expressions;
        let value = match expressions.get(name) {
            Some(Expression::Number(value)) => *value,
            Some(Expression::Text(text)) => match text.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => value,
                _ => self.evaluate_named(name, text)?,
            },
            None => return Err(ExpressionError::UnknownVariable(name.to_string())),
        };
        self.known.insert(name.to_string(), value);
        Ok(value)
    }

    fn evaluate_named(&mut self, name: &str, source: &str) -> Result<f64> {
        if let Some(start) = self.resolving.iter().position(|n| n == name) {
            let mut chain = self.resolving[start..].to_vec();
            chain.push(name.to_string());
            return Err(ExpressionError::CircularReference(chain.join(" -> ")));
        }
        self.resolving.push(name.to_string());
        let result = self.evaluate(source);
        self.resolving.pop();
        result
    }
}

fn reduce(source: &str, postfix: &[PostfixItem]) -> Result<f64> {
    let mut stack: Vec<f64> = Vec::new();
    for item in postfix {
        match item {
            PostfixItem::Value(value) => stack.push(*value),
            PostfixItem::Op(op) => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return Err(ExpressionError::Malformed(source.to_string()));
                };
                stack.push(op.apply(a, b)?);
            }
        }
    }
    match stack.as_slice() {
        [value] => Ok(*value),
        _ => Err(ExpressionError::Malformed(source.to_string())),
    }
}

/// Evaluate every entry of `expressions` in declaration order.
///
/// `seeds` pre-populate the known table; the result holds the seeds plus one
/// value per expression key.
pub fn calculate(
    expressions: &IndexMap<String, Expression>,
    seeds: IndexMap<String, f64>,
) -> Result<IndexMap<String, f64>> {
    let mut evaluator = Evaluator::new(expressions, seeds);
    for (key, expression) in expressions {
        let value = match expression {
            Expression::Number(value) => *value,
            Expression::Text(text) => evaluator.evaluate_named(key, text)?,
        };
        evaluator.assign(key, value);
    }
    Ok(evaluator.into_known())
}
