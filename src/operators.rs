//! The operator registry: the twenty built-in operators and the extension
//! point for caller-defined ones.

use std::fmt;

use crate::coerce::Coercer;
use crate::literal::Literal;
use crate::types::{
    CompareOp, CompileOptions, ConfigurationError, EmptyTarget, Expr, FieldRef, FieldType, Kind,
    RuleNode, TextOp, Value,
};
use crate::FilterError;

/// A caller-defined operator, matched by exact name before the built-ins.
///
/// ```
/// use rulefilter::{CustomOperator, Expr, FilterError, OperatorContext, PredicateFn, Datum};
///
/// struct IsEven;
///
/// impl CustomOperator for IsEven {
///     fn name(&self) -> &str {
///         "is_even"
///     }
///
///     fn build(&self, ctx: &OperatorContext<'_>) -> Result<Expr, FilterError> {
///         Ok(Expr::Predicate {
///             field: ctx.field().clone(),
///             name: "is_even".into(),
///             test: PredicateFn::new(|d| matches!(d, Datum::Int(v) if v % 2 == 0)),
///         })
///     }
/// }
/// ```
pub trait CustomOperator: Send + Sync {
    fn name(&self) -> &str;

    /// Build the condition for one leaf. Paths in the returned expression are
    /// relative to the innermost collection element the field path crossed;
    /// the assembler adds the quantifiers.
    ///
    /// # Errors
    ///
    /// Any [`FilterError`]; [`ConfigurationError::Custom`] is the usual choice.
    fn build(&self, ctx: &OperatorContext<'_>) -> Result<Expr, FilterError>;
}

/// Everything a custom operator may inspect about the leaf it is building.
pub struct OperatorContext<'a> {
    pub(crate) rule: &'a RuleNode,
    pub(crate) field_type: &'a FieldType,
    pub(crate) field: &'a FieldRef,
    pub(crate) literal: &'a Literal,
    pub(crate) coercer: &'a Coercer,
    pub(crate) options: &'a CompileOptions,
}

impl<'a> OperatorContext<'a> {
    #[must_use]
    pub fn rule(&self) -> &'a RuleNode {
        self.rule
    }

    /// The field's declared shape on the record schema.
    #[must_use]
    pub fn field_type(&self) -> &'a FieldType {
        self.field_type
    }

    /// The resolved field, ready to use inside an [`Expr`].
    #[must_use]
    pub fn field(&self) -> &'a FieldRef {
        self.field
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.field.kind
    }

    /// Canonical literal tokens. Strings are split on brackets and commas.
    #[must_use]
    pub fn tokens(&self) -> &'a [String] {
        self.literal.tokens()
    }

    #[must_use]
    pub fn coercer(&self) -> &'a Coercer {
        self.coercer
    }

    #[must_use]
    pub fn options(&self) -> &'a CompileOptions {
        self.options
    }

    /// Coerce every token to the leaf's declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Coercion`] for the first token that does not parse.
    pub fn values(&self) -> Result<Vec<Value>, FilterError> {
        let operator = self.rule.operator.as_deref().unwrap_or_default();
        let field = self.rule.field.as_deref().unwrap_or_default();
        Ok(self
            .coercer
            .coerce_all(self.tokens(), self.kind(), operator, field)?)
    }
}

impl fmt::Debug for OperatorContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorContext")
            .field("field", &self.field.to_string())
            .field("field_type", self.field_type)
            .field("tokens", &self.tokens())
            .finish_non_exhaustive()
    }
}

/// How many literal tokens an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    None,
    One,
    Two,
    AtLeastOne,
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Arity::None => true,
            Arity::One => n == 1,
            Arity::Two => n == 2,
            Arity::AtLeastOne => n >= 1,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Arity::None => "no",
            Arity::One => "exactly 1",
            Arity::Two => "exactly 2",
            Arity::AtLeastOne => "at least 1",
        }
    }
}

/// The built-in operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOp {
    Equal,
    NotEqual,
    In,
    NotIn,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Between,
    NotBetween,
    BeginsWith,
    NotBeginsWith,
    Contains,
    NotContains,
    EndsWith,
    NotEndsWith,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
}

impl BuiltinOp {
    pub const ALL: [BuiltinOp; 20] = [
        BuiltinOp::Equal,
        BuiltinOp::NotEqual,
        BuiltinOp::In,
        BuiltinOp::NotIn,
        BuiltinOp::Less,
        BuiltinOp::LessOrEqual,
        BuiltinOp::Greater,
        BuiltinOp::GreaterOrEqual,
        BuiltinOp::Between,
        BuiltinOp::NotBetween,
        BuiltinOp::BeginsWith,
        BuiltinOp::NotBeginsWith,
        BuiltinOp::Contains,
        BuiltinOp::NotContains,
        BuiltinOp::EndsWith,
        BuiltinOp::NotEndsWith,
        BuiltinOp::IsNull,
        BuiltinOp::IsNotNull,
        BuiltinOp::IsEmpty,
        BuiltinOp::IsNotEmpty,
    ];

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BuiltinOp::Equal => "equal",
            BuiltinOp::NotEqual => "not_equal",
            BuiltinOp::In => "in",
            BuiltinOp::NotIn => "not_in",
            BuiltinOp::Less => "less",
            BuiltinOp::LessOrEqual => "less_or_equal",
            BuiltinOp::Greater => "greater",
            BuiltinOp::GreaterOrEqual => "greater_or_equal",
            BuiltinOp::Between => "between",
            BuiltinOp::NotBetween => "not_between",
            BuiltinOp::BeginsWith => "begins_with",
            BuiltinOp::NotBeginsWith => "not_begins_with",
            BuiltinOp::Contains => "contains",
            BuiltinOp::NotContains => "not_contains",
            BuiltinOp::EndsWith => "ends_with",
            BuiltinOp::NotEndsWith => "not_ends_with",
            BuiltinOp::IsNull => "is_null",
            BuiltinOp::IsNotNull => "is_not_null",
            BuiltinOp::IsEmpty => "is_empty",
            BuiltinOp::IsNotEmpty => "is_not_empty",
        }
    }

    /// The positive operator this one negates, if it is a `not_*` form.
    #[must_use]
    pub fn positive(self) -> Option<BuiltinOp> {
        Some(match self {
            BuiltinOp::NotEqual => BuiltinOp::Equal,
            BuiltinOp::NotIn => BuiltinOp::In,
            BuiltinOp::NotBetween => BuiltinOp::Between,
            BuiltinOp::NotBeginsWith => BuiltinOp::BeginsWith,
            BuiltinOp::NotContains => BuiltinOp::Contains,
            BuiltinOp::NotEndsWith => BuiltinOp::EndsWith,
            BuiltinOp::IsNotNull => BuiltinOp::IsNull,
            BuiltinOp::IsNotEmpty => BuiltinOp::IsEmpty,
            _ => return None,
        })
    }

    pub(crate) fn arity(self) -> Arity {
        match self.positive().unwrap_or(self) {
            BuiltinOp::In => Arity::AtLeastOne,
            BuiltinOp::Between => Arity::Two,
            BuiltinOp::IsNull | BuiltinOp::IsEmpty => Arity::None,
            _ => Arity::One,
        }
    }

    /// Whether string literals are split into several tokens.
    pub(crate) fn splits_literal(self) -> bool {
        matches!(self.arity(), Arity::Two | Arity::AtLeastOne)
    }

    pub(crate) fn takes_value(self) -> bool {
        self.arity() != Arity::None
    }

    /// Check the operator can apply to a field of the given shape, before any
    /// literal is seen.
    pub(crate) fn check_target(
        self,
        field: &str,
        ty: &FieldType,
        declared: Kind,
    ) -> Result<(), ConfigurationError> {
        let unsupported = |reason: &str| ConfigurationError::UnsupportedOperator {
            operator: self.name().to_owned(),
            field: field.to_owned(),
            reason: reason.to_owned(),
        };
        let positive = self.positive().unwrap_or(self);
        if positive == BuiltinOp::IsNull {
            return Ok(());
        }
        let element = match ty {
            FieldType::List(inner) => inner.as_ref(),
            other => other,
        };
        match positive {
            BuiltinOp::IsEmpty => match ty {
                FieldType::List(_) => Ok(()),
                FieldType::Scalar { .. } | FieldType::Dynamic if declared == Kind::String => Ok(()),
                _ => Err(unsupported("emptiness applies to string and collection fields")),
            },
            _ if !matches!(element, FieldType::Scalar { .. } | FieldType::Dynamic) => {
                Err(unsupported("the field is not a scalar or a collection of scalars"))
            }
            BuiltinOp::BeginsWith | BuiltinOp::Contains | BuiltinOp::EndsWith
                if declared != Kind::String =>
            {
                Err(unsupported("text operators apply to string fields"))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn check_arity(self, field: &str, tokens: usize) -> Result<(), ConfigurationError> {
        let arity = self.arity();
        if arity.accepts(tokens) {
            Ok(())
        } else {
            Err(ConfigurationError::Arity {
                operator: self.name().to_owned(),
                field: field.to_owned(),
                expected: arity.describe(),
                actual: tokens,
            })
        }
    }

    /// Build the scalar test for one operator. `collection` is set when the
    /// field holds a sequence: value tests then hold if any element passes,
    /// while null and emptiness look at the sequence itself. `nullable` is
    /// false when the field can never read as null.
    pub(crate) fn build(
        self,
        field: FieldRef,
        collection: bool,
        nullable: bool,
        mut values: Vec<Value>,
    ) -> Expr {
        if let Some(positive) = self.positive() {
            return match positive.build(field, collection, nullable, values) {
                Expr::Constant(b) => Expr::Constant(!b),
                expr => !expr,
            };
        }
        match self {
            BuiltinOp::IsNull => {
                if nullable {
                    Expr::IsNull { field }
                } else {
                    Expr::Constant(false)
                }
            }
            BuiltinOp::IsEmpty => Expr::IsEmpty {
                field,
                target: if collection {
                    EmptyTarget::Collection
                } else {
                    EmptyTarget::Text
                },
            },
            _ => {
                let (subject, outer) = if collection {
                    let element = FieldRef::element(field.kind)
                        .coerced(field.coerce)
                        .folded(field.fold_case)
                        .truncated(field.day_only);
                    (element, Some(field))
                } else {
                    (field, None)
                };
                let test = match self {
                    BuiltinOp::Equal => compare(subject, CompareOp::Eq, &mut values),
                    BuiltinOp::Less => compare(subject, CompareOp::Lt, &mut values),
                    BuiltinOp::LessOrEqual => compare(subject, CompareOp::Lte, &mut values),
                    BuiltinOp::Greater => compare(subject, CompareOp::Gt, &mut values),
                    BuiltinOp::GreaterOrEqual => compare(subject, CompareOp::Gte, &mut values),
                    BuiltinOp::In => Expr::In {
                        field: subject,
                        values,
                    },
                    BuiltinOp::Between => {
                        let high = values.pop();
                        let low = values.pop();
                        match (low, high) {
                            (Some(low), Some(high)) => Expr::Between {
                                field: subject,
                                low,
                                high,
                            },
                            _ => Expr::Constant(false),
                        }
                    }
                    BuiltinOp::BeginsWith => text(subject, TextOp::BeginsWith, values),
                    BuiltinOp::Contains => text(subject, TextOp::Contains, values),
                    BuiltinOp::EndsWith => text(subject, TextOp::EndsWith, values),
                    _ => Expr::Constant(false),
                };
                match outer {
                    Some(collection) => Expr::Any {
                        collection,
                        predicate: Box::new(test),
                    },
                    None => test,
                }
            }
        }
    }
}

fn compare(field: FieldRef, op: CompareOp, values: &mut Vec<Value>) -> Expr {
    match values.pop() {
        Some(value) => Expr::Compare { field, op, value },
        None => Expr::Constant(false),
    }
}

fn text(field: FieldRef, op: TextOp, values: Vec<Value>) -> Expr {
    match values.into_iter().next() {
        Some(Value::String(pattern)) => Expr::Text { field, op, pattern },
        Some(other) => Expr::Text {
            field,
            op,
            pattern: other.to_string(),
        },
        None => Expr::Constant(false),
    }
}

impl fmt::Display for BuiltinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
