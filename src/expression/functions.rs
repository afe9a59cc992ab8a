// ABOUTME: Fixed table of math functions callable as $name(args) inside expressions
// ABOUTME: Validates arity and reports domain errors instead of returning NaN

use super::error::{ExpressionError, Result};

pub const SUPPORTED_FUNCTIONS: &[&str] = &[
    "sqrt", "pow", "sin", "cos", "tan", "exp", "log", "fabs", "ceil", "floor", "lg",
];

pub fn is_supported(name: &str) -> bool {
    SUPPORTED_FUNCTIONS.contains(&name)
}

/// Dispatch a call to the function table.
///
/// `log` takes an optional second argument as the base; every other function
/// has a fixed arity.
pub fn call(name: &str, args: &[f64]) -> Result<f64> {
    let value = match (name, args) {
        ("sqrt", [x]) => x.sqrt(),
        ("pow", [x, y]) => x.powf(*y),
        ("sin", [x]) => x.sin(),
        ("cos", [x]) => x.cos(),
        ("tan", [x]) => x.tan(),
        ("exp", [x]) => x.exp(),
        ("log", [x]) => natural_log(name, *x)?,
        ("log", [x, base]) => {
            let denominator = natural_log(name, *base)?;
            if denominator == 0.0 {
                return Err(ExpressionError::DivisionByZero("log"));
            }
            natural_log(name, *x)? / denominator
        }
        ("fabs", [x]) => x.abs(),
        ("ceil", [x]) => x.ceil(),
        ("floor", [x]) => x.floor(),
        ("lg", [x]) => {
            if *x <= 0.0 {
                return Err(ExpressionError::Domain(name.to_string()));
            }
            x.log10()
        }
        _ if is_supported(name) => {
            return Err(ExpressionError::WrongArity {
                name: name.to_string(),
                given: args.len(),
            })
        }
        _ => return Err(ExpressionError::UnknownFunction(name.to_string())),
    };

    if value.is_nan() && !args.iter().any(|a| a.is_nan()) {
        return Err(ExpressionError::Domain(name.to_string()));
    }
    if value.is_infinite() && args.iter().all(|a| a.is_finite()) {
        return Err(ExpressionError::Overflow(name.to_string()));
    }
    Ok(value)
}

fn natural_log(name: &str, x: f64) -> Result<f64> {
    if x <= 0.0 {
        return Err(ExpressionError::Domain(name.to_string()));
    }
    Ok(x.ln())
}
