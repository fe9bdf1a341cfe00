//! Lowering of the condition IR for query engines that take a structured
//! filter instead of a callable: SQL `WHERE` fragments and MongoDB-style
//! filter documents.

mod document;
mod sql;

use thiserror::Error;

pub use document::{to_document, DocumentQuery};
pub use sql::{to_sql, Dialect, SqlFragment, SqlQuery};

/// The condition has no equivalent in the target query language.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("{target} cannot express {construct} (in `{expr}`)")]
    Unsupported {
        target: &'static str,
        construct: &'static str,
        expr: String,
    },
}

impl TranslateError {
    pub(crate) fn unsupported(
        target: &'static str,
        construct: &'static str,
        expr: &impl std::fmt::Display,
    ) -> Self {
        TranslateError::Unsupported {
            target,
            construct,
            expr: expr.to_string(),
        }
    }
}
