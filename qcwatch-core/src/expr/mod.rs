//! Sandboxed expression language for composite signals, bounds and filters.
//!
//! Expressions are parsed into a small AST and evaluated against a [`Scope`];
//! nothing is ever handed to a host interpreter. The grammar covers:
//!
//! - numbers (`3`, `0.25`, `1e-4`) and the constants `pi`, `e`, `nan`
//! - `{keyword}` references, resolved by the scope (translation keys first,
//!   then specification constants; `ELAPSED_TIME` and `CLOCK_TIME` built in)
//! - bare identifiers, resolved as specification constants
//! - `+ - * /`, `^` or `**`, unary `-` and `!`
//! - comparisons `< <= > >= == !=` yielding `1.0` / `0.0`
//! - logical `&` and `|`
//! - the functions `abs sqrt exp ln log10 sin cos tan min max pow sum mean`
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use qcwatch_core::expr::{Expression, Value};
//!
//! let specs = BTreeMap::from([("Frequency".to_string(), 900.0)]);
//! let expr: Expression = "{Frequency} / 60 + max(1, 2)".parse().unwrap();
//! assert_eq!(expr.eval(&specs).unwrap(), Value::Scalar(17.0));
//! ```

mod eval;
mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use parser::{Expr, Op, Unary, MAX_DEPTH};

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("cannot combine {left} columns with {right} columns")]
    ColumnMismatch { left: usize, right: usize },

    #[error("series length mismatch: {expected} vs {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    /// One or more columns, each aligned with the session's time index.
    Columns(Vec<Vec<f64>>),
}

impl Value {
    /// A single-column value.
    pub fn column(values: Vec<f64>) -> Self {
        Value::Columns(vec![values])
    }

    /// Number of columns (a scalar counts as zero).
    pub fn width(&self) -> usize {
        match self {
            Value::Scalar(_) => 0,
            Value::Columns(cols) => cols.len(),
        }
    }

    /// Iterate every cell.
    pub fn cells(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            Value::Scalar(x) => Box::new(std::iter::once(*x)),
            Value::Columns(cols) => Box::new(cols.iter().flatten().copied()),
        }
    }

    /// Apply `f` to every cell.
    pub fn map(self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(f(x)),
            Value::Columns(cols) => Value::Columns(
                cols.into_iter()
                    .map(|c| c.into_iter().map(&f).collect())
                    .collect(),
            ),
        }
    }

    /// Combine two values cell by cell, broadcasting scalars over columns and
    /// a single column over many.
    pub fn zip_with(self, other: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, ExprError> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(a, b))),
            (Value::Scalar(a), cols @ Value::Columns(_)) => Ok(cols.map(|b| f(a, b))),
            (cols @ Value::Columns(_), Value::Scalar(b)) => Ok(cols.map(|a| f(a, b))),
            (Value::Columns(left), Value::Columns(right)) => {
                let width = match (left.len(), right.len()) {
                    (l, r) if l == r => l,
                    (1, r) => r,
                    (l, 1) => l,
                    (l, r) => return Err(ExprError::ColumnMismatch { left: l, right: r }),
                };
                let mut out = Vec::with_capacity(width);
                for i in 0..width {
                    let a = &left[if left.len() == 1 { 0 } else { i }];
                    let b = &right[if right.len() == 1 { 0 } else { i }];
                    if a.len() != b.len() {
                        return Err(ExprError::LengthMismatch {
                            expected: a.len(),
                            got: b.len(),
                        });
                    }
                    out.push(a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect());
                }
                Ok(Value::Columns(out))
            }
        }
    }

    /// Expand to `width` columns of `rows` samples.
    pub fn into_columns(self, rows: usize) -> Vec<Vec<f64>> {
        match self {
            Value::Scalar(x) => vec![vec![x; rows]],
            Value::Columns(cols) => cols,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(x) => write!(f, "{x}"),
            Value::Columns(cols) => {
                let rows = cols.first().map_or(0, Vec::len);
                write!(f, "<{} x {}>", rows, cols.len())
            }
        }
    }
}

/// Name resolution for expressions.
pub trait Scope {
    /// Resolve a `{keyword}` reference.
    fn keyword(&self, name: &str) -> Option<Value>;

    /// Resolve a bare identifier.
    fn constant(&self, name: &str) -> Option<f64>;
}

/// A plain constant table: `{name}` and `name` both resolve to the constant.
impl Scope for BTreeMap<String, f64> {
    fn keyword(&self, name: &str) -> Option<Value> {
        self.get(name).copied().map(Value::Scalar)
    }

    fn constant(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// A parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        Ok(Self {
            source: source.to_string(),
            ast: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against a scope.
    pub fn eval(&self, scope: &dyn Scope) -> Result<Value, ExprError> {
        eval::eval(&self.ast, scope)
    }

    /// Every `{keyword}` referenced, in order of first appearance.
    pub fn keywords(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Keyword(k) => {
                    if !out.contains(&k.as_str()) {
                        out.push(k);
                    }
                }
                Expr::Unary(_, e) => walk(e, out),
                Expr::Binary(_, l, r) => {
                    walk(l, out);
                    walk(r, out);
                }
                Expr::Call(_, args) => args.iter().for_each(|a| walk(a, out)),
                Expr::Number(_) | Expr::Ident(_) => {}
            }
        }
        let mut out = Vec::new();
        walk(&self.ast, &mut out);
        out
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
