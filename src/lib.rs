mod coerce;
mod compile;
mod error;
mod evaluate;
mod literal;
mod operators;
mod query;
mod resolve;
pub mod translate;
mod types;

#[cfg(feature = "cache")]
mod cache;

pub use coerce::Coercer;
pub use error::FilterError;
pub use literal::Literal;
pub use operators::{BuiltinOp, CustomOperator, OperatorContext};
pub use query::{build_predicate, build_query, QuerySource};
pub use resolve::ResolvedField;
pub use types::{
    Combinator, CompareOp, CompileOptions, CompiledFilter, ConfigurationError, Datum, DateOrder,
    EmptyTarget, Expr, FieldDef, FieldPath, FieldRef, FieldResolutionError, FieldType, Filtered,
    IndexerDef, Kind, Locale, Mapping, NodeKind, PredicateFn, RawValue, Record, RuleNode, Schema,
    Step, TextOp, ToDatum, TypeCoercionError, Value,
};

#[cfg(feature = "cache")]
pub use cache::{CacheStats, FilterCache};
