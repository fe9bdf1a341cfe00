mod compiled;
mod error;
mod expr;
mod kind;
mod options;
mod record;
mod rule;
mod schema;
mod value;

pub use compiled::{CompiledFilter, Filtered};
pub use error::{ConfigurationError, FieldResolutionError, TypeCoercionError};
pub use expr::{CompareOp, EmptyTarget, Expr, FieldPath, FieldRef, PredicateFn, Step, TextOp};
pub use kind::Kind;
pub use options::{CompileOptions, DateOrder, Locale};
pub use record::{Datum, Mapping, Record, ToDatum};
pub use rule::{Combinator, NodeKind, RawValue, RuleNode};
pub use schema::{FieldDef, FieldType, IndexerDef, Schema};
pub use value::Value;
