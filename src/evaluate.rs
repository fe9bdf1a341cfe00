use std::borrow::Cow;
use std::sync::Arc;

use crate::coerce::Coercer;
use crate::types::{
    CompareOp, Datum, EmptyTarget, Expr, FieldRef, Mapping, Record, Step, TypeCoercionError,
};
use crate::FilterError;

type Outcome = Result<bool, FilterError>;

/// A lowered condition: the closure the compiled filter calls per record.
pub(crate) type Eval = Box<dyn Fn(&Datum<'_>) -> Outcome + Send + Sync>;

/// Lower an expression into a closure over the current scope (the record,
/// or a collection element inside a quantifier).
pub(crate) fn lower(expr: &Expr, coercer: &Arc<Coercer>) -> Eval {
    match expr {
        Expr::Constant(b) => {
            let b = *b;
            Box::new(move |_: &Datum<'_>| -> Outcome { Ok(b) })
        }
        Expr::And(children) => {
            let children: Vec<Eval> = children.iter().map(|c| lower(c, coercer)).collect();
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                for child in &children {
                    if !child(scope)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            })
        }
        Expr::Or(children) => {
            let children: Vec<Eval> = children.iter().map(|c| lower(c, coercer)).collect();
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                for child in &children {
                    if child(scope)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            })
        }
        Expr::Not(inner) => {
            let inner = lower(inner, coercer);
            Box::new(move |scope: &Datum<'_>| -> Outcome { Ok(!inner(scope)?) })
        }
        Expr::Compare { field, op, value } => {
            let reader = Reader::new(field, op.rule_name(), coercer);
            let (op, value) = (*op, value.clone());
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                let datum = reader.read(scope)?;
                Ok(datum.compare(op, &value).unwrap_or(false))
            })
        }
        Expr::In { field, values } => {
            let reader = Reader::new(field, "in", coercer);
            let values = values.clone();
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                let datum = reader.read(scope)?;
                Ok(values
                    .iter()
                    .any(|v| datum.compare(CompareOp::Eq, v) == Some(true)))
            })
        }
        Expr::Between { field, low, high } => {
            let reader = Reader::new(field, "between", coercer);
            let (low, high) = (low.clone(), high.clone());
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                let datum = reader.read(scope)?;
                Ok(datum.compare(CompareOp::Gte, &low) == Some(true)
                    && datum.compare(CompareOp::Lte, &high) == Some(true))
            })
        }
        Expr::Text { field, op, pattern } => {
            let reader = Reader::new(field, op.rule_name(), coercer);
            let (op, pattern) = (*op, pattern.clone());
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                let datum = reader.read(scope)?;
                Ok(datum.as_str().is_some_and(|s| op.test(s, &pattern)))
            })
        }
        Expr::IsNull { field } => {
            let reader = Reader::new(field, "is_null", coercer);
            Box::new(move |scope: &Datum<'_>| -> Outcome { Ok(reader.read(scope)?.is_null()) })
        }
        Expr::IsEmpty { field, target } => {
            let reader = Reader::new(field, "is_empty", coercer);
            let target = *target;
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                let datum = reader.read(scope)?;
                Ok(match (target, &datum) {
                    (_, Datum::Null) => true,
                    (EmptyTarget::Text, Datum::Str(s)) => s.is_empty(),
                    (EmptyTarget::Collection, Datum::List(items)) => items.is_empty(),
                    _ => false,
                })
            })
        }
        Expr::Any {
            collection,
            predicate,
        } => {
            let reader = Reader::new(collection, "any", coercer).raw();
            let predicate = lower(predicate, coercer);
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                let Datum::List(items) = reader.read(scope)? else {
                    return Ok(false);
                };
                for item in &items {
                    if predicate(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            })
        }
        Expr::Predicate { field, name, test } => {
            let reader = Reader::new(field, name, coercer);
            let test = test.clone();
            Box::new(move |scope: &Datum<'_>| -> Outcome {
                let datum = reader.read(scope)?;
                Ok((test.0)(&datum))
            })
        }
    }
}

/// Reads one field from a scope, applying per-record coercion and case
/// folding as the field reference asks.
struct Reader {
    field: FieldRef,
    operator: String,
    coercer: Arc<Coercer>,
}

impl Reader {
    fn new(field: &FieldRef, operator: &str, coercer: &Arc<Coercer>) -> Self {
        Self {
            field: field.clone(),
            operator: operator.to_owned(),
            coercer: Arc::clone(coercer),
        }
    }

    /// Skip coercion and folding; used for collection hops.
    fn raw(mut self) -> Self {
        self.field.coerce = false;
        self.field.fold_case = false;
        self
    }

    fn read<'a>(&self, scope: &Datum<'a>) -> Result<Datum<'a>, FilterError> {
        let mut datum = walk(scope, self.field.path.steps());
        if self.field.coerce {
            datum = self
                .coercer
                .coerce_datum(datum, self.field.kind)
                .map_err(|token| TypeCoercionError {
                    operator: self.operator.clone(),
                    field: self.field.path.to_string(),
                    kind: self.field.kind,
                    token,
                })?;
        }
        if self.field.fold_case {
            datum = fold(datum);
        }
        Ok(datum)
    }
}

/// Follow access steps. A missing member, key or intermediate null reads
/// as `Null`.
fn walk<'a>(scope: &Datum<'a>, steps: &[Step]) -> Datum<'a> {
    let mut current = scope.clone();
    for step in steps {
        let next = match (step, &current) {
            (Step::Member(name), Datum::Record(record)) => {
                let record: &'a dyn Record = *record;
                record.field(name)
            }
            (Step::Key(key), Datum::Map(map)) => {
                let map: &'a dyn Mapping = *map;
                map.lookup(key)
            }
            (Step::Index { key, .. }, Datum::Record(record)) => {
                let record: &'a dyn Record = *record;
                record.index(key)
            }
            _ => None,
        };
        current = next.unwrap_or(Datum::Null);
        if current.is_null() {
            break;
        }
    }
    current
}

fn fold(datum: Datum<'_>) -> Datum<'_> {
    match datum {
        Datum::Str(s) => Datum::Str(Cow::Owned(s.to_lowercase())),
        Datum::List(items) => Datum::List(items.into_iter().map(fold).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::{
        FieldPath, FieldType, Kind, PredicateFn, Schema, TextOp, ToDatum, Value,
    };

    struct Row {
        name: String,
        score: Option<i64>,
        tags: Vec<String>,
        attrs: HashMap<String, String>,
    }

    impl Record for Row {
        fn schema() -> Schema {
            Schema::new("Row")
                .field("name", FieldType::scalar(Kind::String))
                .field("score", FieldType::nullable(Kind::Long))
                .field("tags", FieldType::list(FieldType::scalar(Kind::String)))
                .field("attrs", FieldType::map(FieldType::Dynamic))
        }

        fn field(&self, name: &str) -> Option<Datum<'_>> {
            match name {
                "name" => Some(self.name.to_datum()),
                "score" => Some(self.score.to_datum()),
                "tags" => Some(self.tags.to_datum()),
                "attrs" => Some(self.attrs.to_datum()),
                _ => None,
            }
        }
    }

    fn row() -> Row {
        let mut attrs = HashMap::new();
        attrs.insert("size".to_owned(), "12".to_owned());
        attrs.insert("label".to_owned(), "big".to_owned());
        Row {
            name: "Alice".into(),
            score: None,
            tags: vec!["Red".into(), "blue".into()],
            attrs,
        }
    }

    fn member(name: &str, kind: Kind) -> FieldRef {
        FieldRef::new(FieldPath::new(vec![Step::Member(name.into())]), kind)
    }

    fn key(map: &str, key: &str, kind: Kind) -> FieldRef {
        FieldRef::new(
            FieldPath::new(vec![Step::Member(map.into()), Step::Key(key.into())]),
            kind,
        )
        .coerced(true)
    }

    fn eval(expr: &Expr) -> Result<bool, FilterError> {
        let r = row();
        lower(expr, &Arc::new(Coercer::default()))(&Datum::Record(&r))
    }

    #[test]
    fn folded_text_compare() {
        let expr = Expr::Text {
            field: member("name", Kind::String).folded(true),
            op: TextOp::BeginsWith,
            pattern: "al".into(),
        };
        assert_eq!(eval(&expr), Ok(true));
        let exact = Expr::Text {
            field: member("name", Kind::String),
            op: TextOp::BeginsWith,
            pattern: "al".into(),
        };
        assert_eq!(eval(&exact), Ok(false));
    }

    #[test]
    fn null_reads_fail_comparisons() {
        let expr = Expr::Compare {
            field: member("score", Kind::Long),
            op: CompareOp::Lt,
            value: Value::Long(10),
        };
        assert_eq!(eval(&expr), Ok(false));
        assert_eq!(eval(&!expr), Ok(true));
        assert_eq!(eval(&Expr::IsNull { field: member("score", Kind::Long) }), Ok(true));
    }

    #[test]
    fn any_element() {
        let expr = Expr::Any {
            collection: member("tags", Kind::String),
            predicate: Box::new(Expr::Compare {
                field: FieldRef::element(Kind::String).folded(true),
                op: CompareOp::Eq,
                value: Value::String("red".into()),
            }),
        };
        assert_eq!(eval(&expr), Ok(true));
    }

    #[test]
    fn dynamic_values_are_coerced_per_record() {
        let expr = Expr::Compare {
            field: key("attrs", "size", Kind::Integer),
            op: CompareOp::Gt,
            value: Value::Int(10),
        };
        assert_eq!(eval(&expr), Ok(true));
        let missing = Expr::Compare {
            field: key("attrs", "weight", Kind::Integer),
            op: CompareOp::Gt,
            value: Value::Int(10),
        };
        assert_eq!(eval(&missing), Ok(false));
    }

    #[test]
    fn dynamic_coercion_failure_surfaces() {
        let expr = Expr::Compare {
            field: key("attrs", "label", Kind::Integer),
            op: CompareOp::Eq,
            value: Value::Int(1),
        };
        let err = eval(&expr).unwrap_err();
        assert_eq!(
            err,
            FilterError::Coercion(TypeCoercionError {
                operator: "equal".into(),
                field: "attrs[\"label\"]".into(),
                kind: Kind::Integer,
                token: "big".into(),
            })
        );
    }

    #[test]
    fn and_short_circuits_before_errors() {
        let failing = Expr::Compare {
            field: key("attrs", "label", Kind::Integer),
            op: CompareOp::Eq,
            value: Value::Int(1),
        };
        let expr = Expr::Constant(false).and(failing.clone());
        assert_eq!(eval(&expr), Ok(false));
        let expr = Expr::Constant(true).or(failing);
        assert_eq!(eval(&expr), Ok(true));
    }

    #[test]
    fn emptiness() {
        let tags = Expr::IsEmpty {
            field: member("tags", Kind::String),
            target: EmptyTarget::Collection,
        };
        assert_eq!(eval(&tags), Ok(false));
        let score = Expr::IsEmpty {
            field: member("score", Kind::String),
            target: EmptyTarget::Text,
        };
        assert_eq!(eval(&score), Ok(true));
    }

    #[test]
    fn custom_predicate() {
        let expr = Expr::Predicate {
            field: member("name", Kind::String),
            name: "long_name".into(),
            test: PredicateFn::new(|d| d.as_str().is_some_and(|s| s.len() > 3)),
        };
        assert_eq!(eval(&expr), Ok(true));
    }
}
