use thiserror::Error;

use super::kind::Kind;

/// The rule itself is malformed: unknown names, wrong literal counts, or an
/// operator applied where it has no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("unknown locale '{tag}'")]
    UnknownLocale { tag: String },

    #[error("rule is missing its {missing}")]
    IncompleteRule { missing: &'static str },

    #[error("operator '{operator}' on field '{field}' expects {expected} value(s), got {actual}")]
    Arity {
        operator: String,
        field: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("field '{field}' needs indexer access for segment '{segment}' but indexed properties are disabled")]
    IndexerDisabled { field: String, segment: String },

    #[error("cannot traverse into segment '{segment}' of field '{field}': the preceding value is not an object, mapping or collection")]
    NotTraversable { field: String, segment: String },

    #[error("field '{field}' holds {actual} values but the rule declares type '{declared}'")]
    TypeMismatch {
        field: String,
        declared: Kind,
        actual: Kind,
    },

    #[error("operator '{operator}' cannot be applied to field '{field}': {reason}")]
    UnsupportedOperator {
        operator: String,
        field: String,
        reason: String,
    },

    #[error("custom operator '{operator}' rejected the rule: {message}")]
    Custom { operator: String, message: String },
}

/// A literal token could not be converted into the declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce '{token}' to {kind} for operator '{operator}' on field '{field}'")]
pub struct TypeCoercionError {
    pub operator: String,
    pub field: String,
    pub kind: Kind,
    pub token: String,
}

/// A field path segment names nothing on the record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no member, mapping key or indexer named '{segment}' on '{schema}' while resolving field '{field}'")]
pub struct FieldResolutionError {
    pub field: String,
    pub segment: String,
    pub schema: String,
}
