//! Row-level filtering
//!
//! A row filter decides whether a whole record is visible to a user before any
//! field is examined. The policy authority supplies the expression; an
//! evaluator runs it against the raw record.

pub mod expression;

pub use expression::{Expr, ExpressionFilter};

use crate::error::RowFilterError;
use serde_json::Value;
use std::sync::Arc;

/// Evaluates row filter expressions
pub trait RowFilterEvaluator: Send + Sync {
    /// Whether `record` passes `expression` for `user`
    fn evaluate(
        &self,
        expression: &str,
        user: &str,
        record: &Value,
    ) -> Result<bool, RowFilterError>;
}

/// Shared handle to an evaluator
pub type SharedRowFilter = Arc<dyn RowFilterEvaluator>;
