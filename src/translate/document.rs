use chrono::NaiveDate;
use serde_json::{json, Map, Value as Json};

use crate::types::{CompareOp, EmptyTarget, Expr, FieldRef, Step, TextOp, Value};

use super::TranslateError;

const TARGET: &str = "a document filter";

/// Render a condition as a MongoDB-style filter document.
///
/// Member and map-key steps become dotted field names and quantifiers become
/// `$elemMatch`. Negation uses `$nor`, so a missing field counts as a failed
/// test, matching in-memory evaluation.
///
/// ```
/// use rulefilter::translate::to_document;
/// use rulefilter::{CompareOp, Expr, FieldPath, FieldRef, Kind, Step, Value};
///
/// let field = FieldRef::new(FieldPath::new(vec![Step::Member("age".into())]), Kind::Integer);
/// let expr = Expr::Compare { field, op: CompareOp::Gte, value: Value::Int(18) };
/// assert_eq!(to_document(&expr).unwrap(), serde_json::json!({"age": {"$gte": 18}}));
/// ```
///
/// # Errors
///
/// Returns [`TranslateError::Unsupported`] for indexer steps, custom
/// predicates, case-insensitive ordering and ranges, and compound tests on
/// bare collection elements.
pub fn to_document(expr: &Expr) -> Result<Json, TranslateError> {
    render(expr, false)
}

/// `scalar` is set inside `$elemMatch` over scalar elements, where the
/// document holds operators rather than field names.
fn render(expr: &Expr, scalar: bool) -> Result<Json, TranslateError> {
    match expr {
        Expr::Constant(b) => {
            if scalar {
                return Err(TranslateError::unsupported(TARGET, "a constant element test", expr));
            }
            Ok(if *b { json!({}) } else { json!({ "$expr": false }) })
        }
        Expr::And(children) | Expr::Or(children) => {
            if scalar {
                return Err(TranslateError::unsupported(
                    TARGET,
                    "a compound test on collection elements",
                    expr,
                ));
            }
            let key = if matches!(expr, Expr::And(_)) { "$and" } else { "$or" };
            let docs = children
                .iter()
                .map(|c| render(c, false))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(json!({ key: docs }))
        }
        Expr::Not(inner) => {
            let doc = render(inner, scalar)?;
            Ok(if scalar {
                json!({ "$not": doc })
            } else {
                json!({ "$nor": [doc] })
            })
        }
        Expr::Compare {
            field,
            op,
            value: Value::Date(day),
        } if field.day_only => condition(field, day_compare(*op, *day), expr),
        Expr::Compare { field, op, value } => {
            let doc = match (op, field.fold_case) {
                (CompareOp::Eq, true) => exact_regex(value),
                (CompareOp::Neq, true) => json!({ "$not": exact_regex(value) }),
                (_, true) => {
                    return Err(TranslateError::unsupported(
                        TARGET,
                        "case-insensitive ordering",
                        expr,
                    ));
                }
                (op, false) => json!({ compare_key(*op): to_json(value) }),
            };
            condition(field, doc, expr)
        }
        Expr::In { field, values }
            if field.day_only && values.iter().all(|v| matches!(v, Value::Date(_))) =>
        {
            if values.is_empty() {
                return condition(field, json!({ "$in": [] }), expr);
            }
            if field.path.is_element() {
                return Err(TranslateError::unsupported(TARGET, "a day match on collection elements", expr));
            }
            let name = field_name(field, expr)?;
            let days: Vec<Json> = values
                .iter()
                .filter_map(|v| match v {
                    Value::Date(day) => Some(json!({ name.as_str(): day_compare(CompareOp::Eq, *day) })),
                    _ => None,
                })
                .collect();
            Ok(json!({ "$or": days }))
        }
        Expr::In { field, values } => {
            let items: Vec<Json> = if field.fold_case {
                values.iter().map(exact_regex).collect()
            } else {
                values.iter().map(to_json).collect()
            };
            condition(field, json!({ "$in": items }), expr)
        }
        Expr::Between { field, .. } if field.fold_case => Err(TranslateError::unsupported(
            TARGET,
            "case-insensitive range",
            expr,
        )),
        Expr::Between {
            field,
            low,
            high: Value::Date(high),
        } if field.day_only => {
            let doc = match high.succ_opt() {
                Some(next) => json!({ "$gte": to_json(low), "$lt": date_json(next) }),
                None => json!({ "$gte": to_json(low) }),
            };
            condition(field, doc, expr)
        }
        Expr::Between { field, low, high } => condition(
            field,
            json!({ "$gte": to_json(low), "$lte": to_json(high) }),
            expr,
        ),
        Expr::Text { field, op, pattern } => {
            let escaped = escape_regex(pattern);
            let regex = match op {
                TextOp::BeginsWith => format!("^{escaped}"),
                TextOp::Contains => escaped,
                TextOp::EndsWith => format!("{escaped}$"),
            };
            condition(field, regex_doc(regex, field.fold_case), expr)
        }
        Expr::IsNull { field } => condition(field, json!({ "$eq": null }), expr),
        Expr::IsEmpty {
            field,
            target: EmptyTarget::Text,
        } => condition(field, json!({ "$in": [null, ""] }), expr),
        Expr::IsEmpty {
            field,
            target: EmptyTarget::Collection,
        } => {
            if field.path.is_element() {
                return Err(TranslateError::unsupported(TARGET, "a nested collection length test", expr));
            }
            let name = field_name(field, expr)?;
            Ok(json!({ "$or": [{ name.as_str(): null }, { name.as_str(): { "$size": 0 } }] }))
        }
        Expr::Any {
            collection,
            predicate,
        } => {
            if collection.path.is_element() {
                return Err(TranslateError::unsupported(TARGET, "a nested collection quantifier", expr));
            }
            let inner = render(predicate, reads_element(predicate))?;
            condition(collection, json!({ "$elemMatch": inner }), expr)
        }
        Expr::Predicate { .. } => Err(TranslateError::unsupported(TARGET, "a custom predicate", expr)),
    }
}

fn condition(field: &FieldRef, doc: Json, expr: &Expr) -> Result<Json, TranslateError> {
    if field.path.is_element() {
        return Ok(doc);
    }
    let mut map = Map::new();
    map.insert(field_name(field, expr)?, doc);
    Ok(Json::Object(map))
}

fn field_name(field: &FieldRef, expr: &Expr) -> Result<String, TranslateError> {
    let mut parts = Vec::with_capacity(field.path.steps().len());
    for step in field.path.steps() {
        match step {
            Step::Member(name) | Step::Key(name) => parts.push(name.as_str()),
            Step::Index { .. } => {
                return Err(TranslateError::unsupported(TARGET, "an indexer step", expr));
            }
        }
    }
    Ok(parts.join("."))
}

/// Whether the test reads the quantified element itself rather than one of
/// its fields.
fn reads_element(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(_) => false,
        Expr::And(children) | Expr::Or(children) => children.iter().any(reads_element),
        Expr::Not(inner) => reads_element(inner),
        Expr::Compare { field, .. }
        | Expr::In { field, .. }
        | Expr::Between { field, .. }
        | Expr::Text { field, .. }
        | Expr::IsNull { field }
        | Expr::IsEmpty { field, .. }
        | Expr::Predicate { field, .. } => field.path.is_element(),
        Expr::Any { collection, .. } => collection.path.is_element(),
    }
}

fn compare_key(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "$eq",
        CompareOp::Neq => "$ne",
        CompareOp::Gt => "$gt",
        CompareOp::Gte => "$gte",
        CompareOp::Lt => "$lt",
        CompareOp::Lte => "$lte",
    }
}

/// Comparison of a timestamp field against a whole calendar day.
fn day_compare(op: CompareOp, day: NaiveDate) -> Json {
    let start = date_json(day);
    let Some(next) = day.succ_opt().map(date_json) else {
        // Nothing is stored after the last representable day.
        return match op {
            CompareOp::Eq | CompareOp::Gte => json!({ "$gte": start }),
            CompareOp::Neq | CompareOp::Lt => json!({ "$lt": start }),
            CompareOp::Gt => json!({ "$in": [] }),
            CompareOp::Lte => json!({ "$ne": null }),
        };
    };
    match op {
        CompareOp::Eq => json!({ "$gte": start, "$lt": next }),
        CompareOp::Neq => json!({ "$not": { "$gte": start, "$lt": next } }),
        CompareOp::Gt => json!({ "$gte": next }),
        CompareOp::Gte => json!({ "$gte": start }),
        CompareOp::Lt => json!({ "$lt": start }),
        CompareOp::Lte => json!({ "$lt": next }),
    }
}

fn regex_doc(pattern: String, fold_case: bool) -> Json {
    if fold_case {
        json!({ "$regex": pattern, "$options": "i" })
    } else {
        json!({ "$regex": pattern })
    }
}

fn exact_regex(value: &Value) -> Json {
    let text = match value {
        Value::String(s) => escape_regex(s),
        other => escape_regex(&other.to_string()),
    };
    regex_doc(format!("^{text}$"), true)
}

fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Extended-JSON form of a literal.
fn to_json(value: &Value) -> Json {
    match value {
        Value::Int(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::String(v) => json!(v),
        Value::Bool(v) => json!(v),
        Value::Date(v) => date_json(*v),
        Value::DateTime(v) => json!({ "$date": format!("{}Z", v.format("%Y-%m-%dT%H:%M:%S%.3f")) }),
        Value::Guid(v) => json!({ "$uuid": v.hyphenated().to_string() }),
    }
}

fn date_json(day: NaiveDate) -> Json {
    json!({ "$date": format!("{}T00:00:00Z", day.format("%Y-%m-%d")) })
}

/// A collection name plus the filter document to run against it.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    collection: String,
    filter: Json,
}

impl DocumentQuery {
    #[must_use]
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_owned(),
            filter: json!({}),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn filter(&self) -> &Json {
        &self.filter
    }

    /// Conjoin a condition with the current filter.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError`] if the condition has no document form.
    pub fn and_filter(mut self, expr: &Expr) -> Result<Self, TranslateError> {
        let doc = to_document(expr)?;
        if is_empty_doc(&doc) {
            return Ok(self);
        }
        self.filter = if is_empty_doc(&self.filter) {
            doc
        } else {
            json!({ "$and": [self.filter, doc] })
        };
        Ok(self)
    }
}

fn is_empty_doc(doc: &Json) -> bool {
    doc.as_object().is_some_and(Map::is_empty)
}
