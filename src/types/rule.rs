use std::fmt;

use serde::{Deserialize, Serialize};

/// How a fork combines its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    #[serde(alias = "AND", alias = "And")]
    And,
    #[serde(alias = "OR", alias = "Or")]
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => write!(f, "AND"),
            Combinator::Or => write!(f, "OR"),
        }
    }
}

/// A rule's literal payload as the caller supplied it.
///
/// Deserializes from any JSON shape a rule builder emits. Objects that have
/// no scalar meaning land in [`RawValue::Other`] and are reduced to their
/// text form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<RawValue>),
    Other(serde_json::Value),
}

impl RawValue {
    /// Reduce a value that is only meaningful through its text form.
    pub fn from_display(value: &impl fmt::Display) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Int(i64::from(v))
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(v: Vec<T>) -> Self {
        RawValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RawValue>, const N: usize> From<[T; N]> for RawValue {
    fn from(v: [T; N]) -> Self {
        RawValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Json::Bool(b) => RawValue::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Int(i),
                None => n.as_f64().map_or(RawValue::Other(Json::Number(n)), RawValue::Float),
            },
            Json::String(s) => RawValue::Text(s),
            Json::Array(items) => RawValue::List(items.into_iter().map(RawValue::from).collect()),
            other => RawValue::Other(other),
        }
    }
}

/// One node of a caller-supplied rule tree.
///
/// A node with children is a *fork* and its leaf slots are ignored. A node
/// without children but with a `field` is a *leaf*. A node with neither is
/// empty: skipped inside a fork, and "match everything" at the root.
///
/// ```
/// use rulefilter::RuleNode;
///
/// let rule = RuleNode::and(vec![
///     RuleNode::leaf("id", "in", "integer", vec![1, 2]),
///     RuleNode::leaf("name", "begins_with", "string", "a"),
/// ]);
/// assert!(rule.is_fork());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Combinator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleNode>,
}

/// Classification of a [`RuleNode`].
#[derive(Debug, Clone, Copy)]
pub enum NodeKind<'a> {
    Fork {
        combinator: Combinator,
        children: &'a [RuleNode],
    },
    Leaf(&'a RuleNode),
    Empty,
}

impl RuleNode {
    #[must_use]
    pub fn leaf(field: &str, operator: &str, ty: &str, value: impl Into<RawValue>) -> Self {
        Self {
            field: Some(field.to_owned()),
            operator: Some(operator.to_owned()),
            ty: Some(ty.to_owned()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A leaf whose operator takes no value (`is_null`, `is_empty`, ...).
    #[must_use]
    pub fn unary(field: &str, operator: &str, ty: &str) -> Self {
        Self {
            field: Some(field.to_owned()),
            operator: Some(operator.to_owned()),
            ty: Some(ty.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn and(children: Vec<RuleNode>) -> Self {
        Self::fork(Combinator::And, children)
    }

    #[must_use]
    pub fn or(children: Vec<RuleNode>) -> Self {
        Self::fork(Combinator::Or, children)
    }

    #[must_use]
    pub fn fork(combinator: Combinator, children: Vec<RuleNode>) -> Self {
        Self {
            condition: Some(combinator),
            rules: children,
            ..Self::default()
        }
    }

    /// Parse a rule tree from rule-builder JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed input.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind<'_> {
        if !self.rules.is_empty() {
            NodeKind::Fork {
                combinator: self.condition.unwrap_or_default(),
                children: &self.rules,
            }
        } else if self.field.is_some() {
            NodeKind::Leaf(self)
        } else {
            NodeKind::Empty
        }
    }

    #[must_use]
    pub fn is_fork(&self) -> bool {
        matches!(self.kind(), NodeKind::Fork { .. })
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind(), NodeKind::Leaf(_))
    }

    /// Whether this node contributes nothing, recursively.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self.kind() {
            NodeKind::Fork { children, .. } => children.iter().all(RuleNode::is_empty),
            NodeKind::Leaf(_) => false,
            NodeKind::Empty => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_nodes() {
        assert!(RuleNode::leaf("id", "equal", "integer", 1).is_leaf());
        assert!(RuleNode::and(vec![RuleNode::default()]).is_fork());
        assert!(matches!(RuleNode::default().kind(), NodeKind::Empty));
    }

    #[test]
    fn fork_ignores_leaf_slots() {
        let mut node = RuleNode::or(vec![RuleNode::leaf("a", "equal", "string", "x")]);
        node.field = Some("ignored".into());
        assert!(node.is_fork());
    }

    #[test]
    fn nested_empty_forks_are_empty() {
        let node = RuleNode::and(vec![RuleNode::or(vec![RuleNode::default()])]);
        assert!(node.is_empty());
        let node = RuleNode::and(vec![RuleNode::unary("a", "is_null", "string")]);
        assert!(!node.is_empty());
    }

    #[test]
    fn deserialize_rule_builder_json() {
        let json = r#"{
            "condition": "AND",
            "rules": [
                {"id": "price", "field": "price", "type": "double", "input": "number",
                 "operator": "between", "value": [1.5, 3]},
                {"condition": "or", "rules": [
                    {"field": "name", "type": "string", "operator": "contains", "value": "abc"},
                    {"field": "deleted", "type": "boolean", "operator": "equal", "value": true}
                ]}
            ],
            "valid": true
        }"#;
        let rule = RuleNode::from_json(json).unwrap();
        assert_eq!(rule.condition, Some(Combinator::And));
        assert_eq!(rule.rules.len(), 2);
        assert_eq!(
            rule.rules[0].value,
            Some(RawValue::List(vec![RawValue::Float(1.5), RawValue::Int(3)]))
        );
        assert_eq!(rule.rules[1].condition, Some(Combinator::Or));
        assert_eq!(rule.rules[1].rules[1].value, Some(RawValue::Bool(true)));
    }

    #[test]
    fn json_null_value_is_absent() {
        let rule =
            RuleNode::from_json(r#"{"field":"a","type":"string","operator":"is_null","value":null}"#)
                .unwrap();
        assert_eq!(rule.value, None);
    }

    #[test]
    fn object_values_are_kept_opaque() {
        let rule = RuleNode::from_json(
            r#"{"field":"a","type":"string","operator":"equal","value":{"k":1}}"#,
        )
        .unwrap();
        assert!(matches!(rule.value, Some(RawValue::Other(_))));
    }

    #[test]
    fn from_json_value() {
        let raw = RawValue::from(serde_json::json!(["a", 2, 2.5, false]));
        assert_eq!(
            raw,
            RawValue::List(vec![
                RawValue::Text("a".into()),
                RawValue::Int(2),
                RawValue::Float(2.5),
                RawValue::Bool(false),
            ])
        );
    }

    #[test]
    fn serialize_round_trips_shape() {
        let rule = RuleNode::and(vec![RuleNode::leaf("id", "in", "integer", vec![1, 2])]);
        let text = serde_json::to_string(&rule).unwrap();
        assert_eq!(
            text,
            r#"{"condition":"and","rules":[{"field":"id","operator":"in","type":"integer","value":[1,2]}]}"#
        );
    }
}
