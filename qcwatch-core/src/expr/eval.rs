//! Tree-walking evaluator with scalar/column broadcasting.

use super::parser::{Expr, Op, Unary};
use super::{ExprError, Scope, Value};

type Result<T> = std::result::Result<T, ExprError>;

pub(crate) fn eval(expr: &Expr, scope: &dyn Scope) -> Result<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Scalar(*n)),
        Expr::Keyword(name) => scope
            .keyword(name)
            .ok_or_else(|| ExprError::UnknownVariable(name.clone())),
        Expr::Ident(name) => scope
            .constant(name)
            .or_else(|| builtin_constant(name))
            .map(Value::Scalar)
            .ok_or_else(|| ExprError::UnknownVariable(name.clone())),
        Expr::Unary(op, operand) => {
            let value = eval(operand, scope)?;
            Ok(match op {
                Unary::Neg => value.map(|x| -x),
                Unary::Not => value.map(|x| truth(!is_true(x))),
            })
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, scope)?;
            let rhs = eval(rhs, scope)?;
            let f = binary_fn(*op);
            lhs.zip_with(rhs, f)
        }
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<Result<Vec<_>>>()?;
            call(name, args)
        }
    }
}

fn builtin_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "nan" | "NaN" => Some(f64::NAN),
        _ => None,
    }
}

fn is_true(x: f64) -> bool {
    x != 0.0 && !x.is_nan()
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn binary_fn(op: Op) -> fn(f64, f64) -> f64 {
    match op {
        Op::Add => |a, b| a + b,
        Op::Sub => |a, b| a - b,
        Op::Mul => |a, b| a * b,
        Op::Div => |a, b| a / b,
        Op::Pow => f64::powf,
        Op::Lt => |a, b| truth(a < b),
        Op::Le => |a, b| truth(a <= b),
        Op::Gt => |a, b| truth(a > b),
        Op::Ge => |a, b| truth(a >= b),
        Op::Eq => |a, b| truth(a == b),
        Op::Ne => |a, b| truth(a != b),
        Op::And => |a, b| truth(is_true(a) && is_true(b)),
        Op::Or => |a, b| truth(is_true(a) || is_true(b)),
    }
}

fn arity(name: &str, expected: usize, args: &[Value]) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

/// Whitelisted function calls.
fn call(name: &str, mut args: Vec<Value>) -> Result<Value> {
    let unary: Option<fn(f64) -> f64> = match name {
        "abs" => Some(f64::abs),
        "sqrt" => Some(f64::sqrt),
        "exp" => Some(f64::exp),
        "ln" | "log" => Some(f64::ln),
        "log10" => Some(f64::log10),
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        _ => None,
    };
    if let Some(f) = unary {
        arity(name, 1, &args)?;
        return Ok(args.remove(0).map(f));
    }

    match name {
        "pow" => {
            arity(name, 2, &args)?;
            let exponent = args.remove(1);
            args.remove(0).zip_with(exponent, f64::powf)
        }
        "min" | "max" => {
            let pick: fn(f64, f64) -> f64 = if name == "min" { nan_min } else { nan_max };
            match args.len() {
                0 => Err(ExprError::Arity {
                    name: name.to_string(),
                    expected: 1,
                    got: 0,
                }),
                1 => Ok(Value::Scalar(args[0].cells().fold(f64::NAN, pick))),
                _ => {
                    let mut iter = args.into_iter();
                    let first = iter.next().unwrap_or(Value::Scalar(f64::NAN));
                    iter.try_fold(first, |acc, v| acc.zip_with(v, pick))
                }
            }
        }
        "sum" => {
            arity(name, 1, &args)?;
            Ok(Value::Scalar(args[0].cells().filter(|x| !x.is_nan()).sum()))
        }
        "mean" => {
            arity(name, 1, &args)?;
            let (sum, n) = args[0]
                .cells()
                .filter(|x| !x.is_nan())
                .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
            Ok(Value::Scalar(if n == 0 { f64::NAN } else { sum / n as f64 }))
        }
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}

fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() {
        b
    } else if b.is_nan() {
        a
    } else {
        a.max(b)
    }
}
