// ABOUTME: Left-to-right scanner that splits an expression into typed tokens
// ABOUTME: Classifies each run of characters as variable, number, operator, function call or group

use super::error::{ExpressionError, Result};

const OPERATOR_CHARS: &str = "+-*/%";
const FUNCTION_START: char = '$';
const GROUP_START: char = '(';
const GROUP_END: char = ')';
const ARG_SEPARATOR: char = ',';

/// Binary operators understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl Operator {
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Sub),
            "*" => Some(Operator::Mul),
            "/" => Some(Operator::Div),
            "//" => Some(Operator::FloorDiv),
            "%" => Some(Operator::Mod),
            "**" => Some(Operator::Pow),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "**",
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 1,
            Operator::Mul | Operator::Div | Operator::FloorDiv | Operator::Mod => 2,
            Operator::Pow => 3,
        }
    }

    /// Apply the operator with floor-division and modulo following the sign
    /// of the divisor. Finite operands must give a finite result.
    pub fn apply(&self, a: f64, b: f64) -> Result<f64> {
        let value = self.compute(a, b)?;
        if value.is_infinite() && a.is_finite() && b.is_finite() {
            return Err(ExpressionError::Overflow(self.symbol().to_string()));
        }
        Ok(value)
    }

    fn compute(&self, a: f64, b: f64) -> Result<f64> {
        match self {
            Operator::Add => Ok(a + b),
            Operator::Sub => Ok(a - b),
            Operator::Mul => Ok(a * b),
            Operator::Div => {
                if b == 0.0 {
                    return Err(ExpressionError::DivisionByZero(self.symbol()));
                }
                Ok(a / b)
            }
            Operator::FloorDiv => {
                if b == 0.0 {
                    return Err(ExpressionError::DivisionByZero(self.symbol()));
                }
                Ok((a / b).floor())
            }
            Operator::Mod => {
                if b == 0.0 {
                    return Err(ExpressionError::DivisionByZero(self.symbol()));
                }
                let remainder = a % b;
                if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                    Ok(remainder + b)
                } else {
                    Ok(remainder)
                }
            }
            Operator::Pow => Ok(a.powf(b)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Variable(String),
    Number(f64),
    Operator(Operator),
    /// `$name(arg, ...)`; arguments are kept as raw sub-expressions.
    Function { name: String, args: Vec<String> },
    /// Contents of a parenthesized sub-expression, outer parentheses removed.
    Group(String),
}

pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.pos < self.chars.len() && keep(self.chars[self.pos]) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Reads from an opening parenthesis to its matching close and returns the
    /// inner text.
    fn read_group(&mut self) -> Result<String> {
        let open = self.pos;
        let mut depth = 0usize;
        while self.pos < self.chars.len() {
            match self.chars[self.pos] {
                GROUP_START => depth += 1,
                GROUP_END => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = self.chars[open + 1..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(ExpressionError::UnbalancedParenthesis(open))
    }

    fn read_variable(&mut self) -> Token {
        Token::Variable(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'))
    }

    fn read_number(&mut self) -> Result<Token> {
        let literal = self.take_while(|c| {
            !(c.is_whitespace()
                || OPERATOR_CHARS.contains(c)
                || c == FUNCTION_START
                || c == GROUP_START
                || c == GROUP_END)
        });
        literal
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExpressionError::InvalidNumber(literal))
    }

    fn read_operator(&mut self) -> Result<Token> {
        let symbol = self.take_while(|c| OPERATOR_CHARS.contains(c));
        Operator::parse(&symbol)
            .map(Token::Operator)
            .ok_or(ExpressionError::UnknownOperator(symbol))
    }

    fn read_function(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;
        let name = self.take_while(|c| c != GROUP_START && !c.is_whitespace());
        self.skip_whitespace();
        if name.is_empty() || self.pos >= self.chars.len() || self.chars[self.pos] != GROUP_START
        {
            let text: String = self.chars[start..self.pos].iter().collect();
            return Err(ExpressionError::MalformedFunction(text));
        }
        let inner = self.read_group()?;
        Ok(Token::Function {
            name,
            args: split_arguments(&inner),
        })
    }
}

impl Iterator for Scanner {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let first = *self.chars.get(self.pos)?;

        let token = if first.is_ascii_alphabetic() || first == '_' {
            Ok(self.read_variable())
        } else if first.is_ascii_digit() || first == '.' {
            self.read_number()
        } else if OPERATOR_CHARS.contains(first) {
            self.read_operator()
        } else if first == FUNCTION_START {
            self.read_function()
        } else if first == GROUP_START {
            self.read_group().map(Token::Group)
        } else {
            let position = self.pos;
            // Skip the rest so the iterator terminates after reporting.
            self.pos = self.chars.len();
            Err(ExpressionError::InvalidCharacter {
                ch: first,
                position,
            })
        };

        if token.is_err() {
            self.pos = self.chars.len();
        }
        Some(token)
    }
}

/// Splits function arguments on commas that are not nested inside parentheses.
fn split_arguments(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in inner.chars() {
        match c {
            GROUP_START => depth += 1,
            GROUP_END => depth = depth.saturating_sub(1),
            ARG_SEPARATOR if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    args.push(current.trim().to_string());
    args
}
