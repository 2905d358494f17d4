//! Derived-column expressions.
//!
//! Pipeline:
//! ```text
//!   "log(\"Energy eV\") * 2"
//!        │
//!        ▼
//!   ┌────────┐  tokens (wider than the grammar)
//!   │ lexer  │
//!   └────────┘
//!        │
//!        ▼
//!   ┌────────┐  unchecked Node tree
//!   │ parser │
//!   └────────┘
//!        │
//!        ▼
//!   ┌────────┐  allow-list → Expr (only accepted constructs exist)
//!   │ check  │
//!   └────────┘
//!        │
//!        ▼
//!   ┌────────┐  bind columns, evaluate element-wise, reject NaN/inf
//!   │  eval  │
//!   └────────┘
//! ```
//!
//! Nothing is evaluated until the whole tree has passed the check and every
//! column reference has been resolved.

pub mod check;
pub mod eval;
pub mod lexer;
pub mod parser;

use std::collections::BTreeMap;

pub use check::{ArithOp, Expr, Function};

use crate::data::model::ColumnLookup;
use crate::error::{ExpressionError, ExpressionErrorKind};

/// Syntax errors carry a byte offset; users see a 1-based character position.
fn syntax_error(text: &str, message: &str, offset: usize) -> ExpressionError {
    let position = text
        .get(..offset)
        .map_or(offset, |prefix| prefix.chars().count())
        + 1;
    ExpressionError::new(ExpressionErrorKind::Syntax, text, "Invalid expression syntax")
        .with_detail(format!("{message} at position {position}"))
}

/// A compiled, allow-list-checked expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Tokenize, parse and check `text`.
    pub fn compile(text: &str) -> Result<Self, ExpressionError> {
        let tokens =
            lexer::tokenize(text).map_err(|e| syntax_error(text, &e.message, e.offset))?;
        let tree =
            parser::parse(&tokens).map_err(|e| syntax_error(text, &e.message, e.offset))?;
        let root = check::check(&tree).map_err(|check::Rejection(reason)| {
            log::debug!("rejected expression {text:?}: {reason}");
            ExpressionError::new(
                ExpressionErrorKind::Disallowed,
                text,
                "Invalid or unsafe expression",
            )
            .with_detail(reason)
        })?;
        Ok(Self {
            source: text.to_string(),
            root,
        })
    }

    /// The text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Distinct column names referenced, in order of first appearance.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        self.root.for_each_column(&mut |name| {
            if !names.contains(&name) {
                names.push(name);
            }
        });
        names
    }

    /// Evaluate against `columns`, returning one value per row.
    ///
    /// Every referenced column is resolved and length-checked before any
    /// arithmetic runs. The result is rejected if it contains NaN or
    /// infinity.
    pub fn evaluate<L>(&self, columns: &L) -> Result<Vec<f64>, ExpressionError>
    where
        L: ColumnLookup + ?Sized,
    {
        let referenced = self.referenced_columns();

        let mut bound: BTreeMap<&str, &[f64]> = BTreeMap::new();
        for name in &referenced {
            let values = columns.lookup(name).ok_or_else(|| {
                ExpressionError::new(
                    ExpressionErrorKind::UnknownColumn,
                    &self.source,
                    format!("Column '{name}' not found"),
                )
                .with_detail(format!("Available columns: {}", columns.names().join(", ")))
            })?;
            bound.insert(*name, values);
        }

        let len = match referenced.first() {
            Some(first) => bound.get(first).map_or(0, |v| v.len()),
            None => columns.row_count(),
        };
        if let Some((name, values)) = bound.iter().find(|(_, v)| v.len() != len) {
            return Err(ExpressionError::new(
                ExpressionErrorKind::LengthMismatch,
                &self.source,
                "Referenced columns differ in length",
            )
            .with_detail(format!(
                "column '{name}' has {} values, expected {len}",
                values.len()
            )));
        }

        let result = eval::evaluate(&self.root, &bound, len);
        self.check_finite(&result)?;
        Ok(result)
    }

    fn check_finite(&self, result: &[f64]) -> Result<(), ExpressionError> {
        if let Some(row) = result.iter().position(|v| v.is_nan()) {
            return Err(ExpressionError::new(
                ExpressionErrorKind::NotANumber,
                &self.source,
                "Expression produced invalid result (NaN)",
            )
            .with_detail(format!(
                "Check for invalid operations like log of negative (first at row {})",
                row + 1
            )));
        }
        if let Some(row) = result.iter().position(|v| v.is_infinite()) {
            return Err(ExpressionError::new(
                ExpressionErrorKind::Infinite,
                &self.source,
                "Expression produced infinite result",
            )
            .with_detail(format!("Check for division by zero (first at row {})", row + 1)));
        }
        Ok(())
    }
}

/// Whether `text` is a well-formed expression inside the allowed grammar.
/// Nothing is evaluated.
pub fn validate_expression(text: &str) -> bool {
    Expression::compile(text).is_ok()
}

/// Compile and evaluate `text` in one step.
pub fn evaluate_expression<L>(text: &str, columns: &L) -> Result<Vec<f64>, ExpressionError>
where
    L: ColumnLookup + ?Sized,
{
    Expression::compile(text)?.evaluate(columns)
}
