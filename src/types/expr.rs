use std::cmp::Ordering;
use std::fmt;
use std::ops::Not;
use std::sync::Arc;

use super::kind::Kind;
use super::record::Datum;
use super::value::Value;

/// Ordinal comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Whether `ord` (left compared to right) satisfies this operator.
    #[must_use]
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Neq => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
        }
    }

    pub(crate) fn rule_name(self) -> &'static str {
        match self {
            CompareOp::Eq => "equal",
            CompareOp::Neq => "not_equal",
            CompareOp::Gt => "greater",
            CompareOp::Gte => "greater_or_equal",
            CompareOp::Lt => "less",
            CompareOp::Lte => "less_or_equal",
        }
    }
}

/// Substring tests on text values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextOp {
    BeginsWith,
    Contains,
    EndsWith,
}

impl TextOp {
    #[must_use]
    pub fn test(self, haystack: &str, needle: &str) -> bool {
        match self {
            TextOp::BeginsWith => haystack.starts_with(needle),
            TextOp::Contains => haystack.contains(needle),
            TextOp::EndsWith => haystack.ends_with(needle),
        }
    }

    pub(crate) fn rule_name(self) -> &'static str {
        match self {
            TextOp::BeginsWith => "begins_with",
            TextOp::Contains => "contains",
            TextOp::EndsWith => "ends_with",
        }
    }
}

/// One access step from a value to a value inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// Named member of a record.
    Member(String),
    /// Runtime key looked up in a mapping.
    Key(String),
    /// Key passed to the record's indexer property.
    Index { indexer: String, key: String },
}

/// A chain of access steps. The empty path is the current value itself,
/// which is how element tests inside [`Expr::Any`] are expressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    steps: Vec<Step>,
}

impl FieldPath {
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// The current element.
    #[must_use]
    pub fn element() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether every step is a plain member access.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.steps.iter().all(|s| matches!(s, Step::Member(_)))
    }

    /// Member names in order, or `None` if any step is a key or indexer.
    #[must_use]
    pub fn member_names(&self) -> Option<Vec<&str>> {
        self.steps
            .iter()
            .map(|s| match s {
                Step::Member(name) => Some(name.as_str()),
                Step::Key(_) | Step::Index { .. } => None,
            })
            .collect()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("it");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Member(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                Step::Key(key) => write!(f, "[\"{key}\"]")?,
                Step::Index { indexer, key } => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{indexer}[\"{key}\"]")?;
                }
            }
        }
        Ok(())
    }
}

/// A resolved field reference inside a condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub path: FieldPath,
    /// Kind declared by the rule.
    pub kind: Kind,
    /// The stored value is boxed and must be coerced per record.
    pub coerce: bool,
    /// Text is lower-cased before comparing.
    pub fold_case: bool,
    /// The stored value is a timestamp compared by its calendar day only.
    pub day_only: bool,
}

impl FieldRef {
    #[must_use]
    pub fn new(path: FieldPath, kind: Kind) -> Self {
        Self {
            path,
            kind,
            coerce: false,
            fold_case: false,
            day_only: false,
        }
    }

    /// A reference to the current element of a quantified collection.
    #[must_use]
    pub fn element(kind: Kind) -> Self {
        Self::new(FieldPath::element(), kind)
    }

    #[must_use]
    pub fn coerced(mut self, coerce: bool) -> Self {
        self.coerce = coerce;
        self
    }

    #[must_use]
    pub fn folded(mut self, fold_case: bool) -> Self {
        self.fold_case = fold_case && self.kind == Kind::String;
        self
    }

    /// Mark a `date` reference to a `datetime` field.
    #[must_use]
    pub fn truncated(mut self, day_only: bool) -> Self {
        self.day_only = day_only && self.kind == Kind::Date;
        self
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fold_case {
            write!(f, "lower({})", self.path)
        } else if self.day_only {
            write!(f, "date({})", self.path)
        } else {
            write!(f, "{}", self.path)
        }
    }
}

/// What an emptiness test measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmptyTarget {
    Text,
    Collection,
}

/// Caller-supplied test attached by a custom operator.
#[derive(Clone)]
pub struct PredicateFn(pub Arc<dyn Fn(&Datum<'_>) -> bool + Send + Sync>);

impl PredicateFn {
    pub fn new(f: impl Fn(&Datum<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for PredicateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PredicateFn(..)")
    }
}

impl PartialEq for PredicateFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The condition IR a rule tree compiles to.
///
/// It is independent of any execution target: [`CompiledFilter`](crate::CompiledFilter)
/// lowers it to a native closure, and the [`translate`](crate::translate)
/// module lowers it to SQL fragments and document filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(bool),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        field: FieldRef,
        op: CompareOp,
        value: Value,
    },
    In {
        field: FieldRef,
        values: Vec<Value>,
    },
    /// Inclusive on both bounds.
    Between {
        field: FieldRef,
        low: Value,
        high: Value,
    },
    Text {
        field: FieldRef,
        op: TextOp,
        pattern: String,
    },
    IsNull {
        field: FieldRef,
    },
    IsEmpty {
        field: FieldRef,
        target: EmptyTarget,
    },
    /// True if any element of `collection` satisfies `predicate`; paths in
    /// the predicate are relative to the element.
    Any {
        collection: FieldRef,
        predicate: Box<Expr>,
    },
    /// Opaque test from a custom operator. Only the native lowering can run it.
    Predicate {
        field: FieldRef,
        name: String,
        test: PredicateFn,
    },
}

impl Expr {
    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        match self {
            Expr::And(mut children) => {
                children.push(other);
                Expr::And(children)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        match self {
            Expr::Or(mut children) => {
                children.push(other);
                Expr::Or(children)
            }
            first => Expr::Or(vec![first, other]),
        }
    }

    /// Wrap `self` in one `Any` per collection hop, innermost last.
    #[must_use]
    pub fn quantify(self, hops: &[FieldRef]) -> Expr {
        hops.iter().rev().fold(self, |predicate, hop| Expr::Any {
            collection: hop.clone(),
            predicate: Box::new(predicate),
        })
    }

    /// Number of leaf conditions.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::Constant(_) => 0,
            Expr::And(children) | Expr::Or(children) => children.iter().map(Expr::leaf_count).sum(),
            Expr::Not(inner) => inner.leaf_count(),
            Expr::Any { predicate, .. } => predicate.leaf_count(),
            Expr::Compare { .. }
            | Expr::In { .. }
            | Expr::Between { .. }
            | Expr::Text { .. }
            | Expr::IsNull { .. }
            | Expr::IsEmpty { .. }
            | Expr::Predicate { .. } => 1,
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for TextOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOp::BeginsWith => write!(f, "BEGINS_WITH"),
            TextOp::Contains => write!(f, "CONTAINS"),
            TextOp::EndsWith => write!(f, "ENDS_WITH"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(b) => write!(f, "{b}"),
            Expr::And(children) => write_joined(f, children, " AND "),
            Expr::Or(children) => write_joined(f, children, " OR "),
            Expr::Not(inner) => write!(f, "(NOT {inner})"),
            Expr::Compare { field, op, value } => write!(f, "({field} {op} {value})"),
            Expr::In { field, values } => {
                write!(f, "({field} IN (")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("))")
            }
            Expr::Between { field, low, high } => {
                write!(f, "({field} BETWEEN {low} AND {high})")
            }
            Expr::Text { field, op, pattern } => write!(f, "({field} {op} \"{pattern}\")"),
            Expr::IsNull { field } => write!(f, "({field} IS NULL)"),
            Expr::IsEmpty { field, .. } => write!(f, "({field} IS EMPTY)"),
            Expr::Any {
                collection,
                predicate,
            } => write!(f, "ANY({}, {predicate})", collection.path),
            Expr::Predicate { field, name, .. } => write!(f, "{name}({field})"),
        }
    }
}
