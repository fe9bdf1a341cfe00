use std::sync::Arc;

use tracing::trace;

use crate::coerce::Coercer;
use crate::literal::Literal;
use crate::operators::{BuiltinOp, CustomOperator, OperatorContext};
use crate::resolve::{ResolvedField, Resolver};
use crate::types::{
    Combinator, CompileOptions, ConfigurationError, Expr, Kind, NodeKind, Record, RuleNode,
};
use crate::FilterError;

/// Everything about a rule tree that does not depend on its literal values:
/// resolved fields, declared kinds and operator bindings.
///
/// A plan built from one tree can be bound to any tree with the same shape.
pub(crate) enum Plan {
    /// Absent or empty root.
    MatchAll,
    Fork {
        combinator: Combinator,
        /// Planned children with their index in the fork's `rules`; empty
        /// children are left out.
        children: Vec<(usize, Plan)>,
    },
    Leaf(LeafPlan),
}

pub(crate) struct LeafPlan {
    field: String,
    declared: Kind,
    operator: Binding,
    resolved: ResolvedField,
    fold_case: bool,
}

enum Binding {
    Builtin(BuiltinOp),
    Custom(Arc<dyn CustomOperator>),
}

impl Binding {
    fn name(&self) -> &str {
        match self {
            Binding::Builtin(op) => op.name(),
            Binding::Custom(op) => op.name(),
        }
    }
}

/// Plan and bind in one go.
pub(crate) fn compile<T: Record>(
    rule: Option<&RuleNode>,
    options: &CompileOptions,
) -> Result<Expr, FilterError> {
    let plan = plan::<T>(rule, options)?;
    let coercer = Coercer::new(options.locale.clone(), options.parse_dates_as_utc);
    bind(&plan, rule, options, &coercer)
}

pub(crate) fn plan<T: Record>(
    rule: Option<&RuleNode>,
    options: &CompileOptions,
) -> Result<Plan, FilterError> {
    let mut planner = Planner {
        resolver: Resolver::new(T::schema, options),
        options,
    };
    match rule {
        Some(node) if !node.is_empty() => planner.node(node),
        _ => Ok(Plan::MatchAll),
    }
}

struct Planner<'o> {
    resolver: Resolver<'o>,
    options: &'o CompileOptions,
}

impl Planner<'_> {
    fn node(&mut self, node: &RuleNode) -> Result<Plan, FilterError> {
        match node.kind() {
            NodeKind::Fork {
                combinator,
                children,
            } => {
                let mut planned = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    if child.is_empty() {
                        continue;
                    }
                    planned.push((i, self.node(child)?));
                }
                Ok(Plan::Fork {
                    combinator,
                    children: planned,
                })
            }
            NodeKind::Leaf(leaf) => self.leaf(leaf).map(Plan::Leaf),
            NodeKind::Empty => Ok(Plan::MatchAll),
        }
    }

    fn leaf(&mut self, node: &RuleNode) -> Result<LeafPlan, FilterError> {
        let field = node
            .field
            .as_deref()
            .ok_or(ConfigurationError::IncompleteRule { missing: "field" })?;
        let declared: Kind = node
            .ty
            .as_deref()
            .ok_or(ConfigurationError::IncompleteRule { missing: "type" })?
            .parse()?;
        let name = node
            .operator
            .as_deref()
            .ok_or(ConfigurationError::IncompleteRule { missing: "operator" })?;

        let operator = if let Some(custom) = self.options.custom_operator(name) {
            Binding::Custom(Arc::clone(custom))
        } else if let Some(builtin) = BuiltinOp::from_name(name) {
            Binding::Builtin(builtin)
        } else {
            return Err(ConfigurationError::UnknownOperator {
                operator: name.to_owned(),
            }
            .into());
        };

        let resolved = self.resolver.resolve(field)?;
        resolved.check_kind(field, declared)?;
        if let Binding::Builtin(op) = &operator {
            op.check_target(field, resolved.field_type(), declared)?;
        }

        trace!(field, operator = name, kind = %declared, "planned leaf");
        Ok(LeafPlan {
            field: field.to_owned(),
            declared,
            operator,
            fold_case: declared == Kind::String && !self.options.string_case_sensitive,
            resolved,
        })
    }
}

/// Attach the literal values of `rule` to a plan built from a tree of the
/// same shape.
pub(crate) fn bind(
    plan: &Plan,
    rule: Option<&RuleNode>,
    options: &CompileOptions,
    coercer: &Coercer,
) -> Result<Expr, FilterError> {
    match (plan, rule) {
        (Plan::MatchAll, _) => Ok(Expr::Constant(true)),
        (Plan::Fork { combinator, children }, Some(node)) => {
            let mut exprs = Vec::with_capacity(children.len());
            for (i, child_plan) in children {
                let child = node.rules.get(*i);
                if child.is_none() {
                    return Err(shape_mismatch());
                }
                exprs.push(bind(child_plan, child, options, coercer)?);
            }
            Ok(combine(*combinator, exprs))
        }
        (Plan::Leaf(leaf), Some(node)) => leaf.bind(node, options, coercer),
        (_, None) => Err(shape_mismatch()),
    }
}

fn shape_mismatch() -> FilterError {
    ConfigurationError::IncompleteRule {
        missing: "child rule",
    }
    .into()
}

fn combine(combinator: Combinator, mut exprs: Vec<Expr>) -> Expr {
    if exprs.len() == 1 {
        return exprs.remove(0);
    }
    match combinator {
        Combinator::And if exprs.is_empty() => Expr::Constant(true),
        Combinator::And => Expr::And(exprs),
        Combinator::Or if exprs.is_empty() => Expr::Constant(false),
        Combinator::Or => Expr::Or(exprs),
    }
}

impl LeafPlan {
    fn bind(
        &self,
        node: &RuleNode,
        options: &CompileOptions,
        coercer: &Coercer,
    ) -> Result<Expr, FilterError> {
        let field = self.resolved.field_ref(self.declared, self.fold_case);
        let hops = self.resolved.hop_refs(self.declared);
        let expr = match &self.operator {
            Binding::Builtin(op) => {
                let (positive, negated) = match op.positive() {
                    Some(positive) => (positive, true),
                    None => (*op, false),
                };
                let literal = if op.takes_value() {
                    Literal::canonicalize(node.value.as_ref(), op.splits_literal(), &options.locale)
                } else {
                    Literal::default()
                };
                op.check_arity(&self.field, literal.len())?;
                let mut values =
                    coercer.coerce_all(literal.tokens(), self.declared, op.name(), &self.field)?;
                if self.fold_case {
                    values = values.into_iter().map(|v| v.fold_case()).collect();
                }
                let test = positive
                    .build(
                        field,
                        self.resolved.is_collection(),
                        self.resolved.nullable(),
                        values,
                    )
                    .quantify(&hops);
                if negated {
                    negate(test)
                } else {
                    test
                }
            }
            Binding::Custom(op) => {
                let literal = Literal::canonicalize(node.value.as_ref(), true, &options.locale);
                let ctx = OperatorContext {
                    rule: node,
                    field_type: self.resolved.field_type(),
                    field: &field,
                    literal: &literal,
                    coercer,
                    options,
                };
                op.build(&ctx)?.quantify(&hops)
            }
        };
        trace!(field = %self.field, operator = self.operator.name(), expr = %expr, "bound leaf");
        Ok(expr)
    }
}

fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Constant(b) => Expr::Constant(!b),
        other => !other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Datum, FieldType, Schema};

    struct Item;

    fn tag() -> Schema {
        Schema::new("Tag").field("label", FieldType::scalar(Kind::String))
    }

    impl Record for Item {
        fn schema() -> Schema {
            Schema::new("Item")
                .field("id", FieldType::scalar(Kind::Integer))
                .field("price", FieldType::nullable(Kind::Double))
                .field("name", FieldType::scalar(Kind::String))
                .field("tags", FieldType::list(FieldType::Object(tag)))
        }

        fn field(&self, _name: &str) -> Option<Datum<'_>> {
            None
        }
    }

    fn text(rule: &RuleNode) -> String {
        compile::<Item>(Some(rule), &CompileOptions::default())
            .unwrap()
            .to_string()
    }

    #[test]
    fn absent_and_empty_rules_match_all() {
        let options = CompileOptions::default();
        assert_eq!(compile::<Item>(None, &options).unwrap(), Expr::Constant(true));
        let empty = RuleNode::and(vec![RuleNode::default()]);
        assert_eq!(compile::<Item>(Some(&empty), &options).unwrap(), Expr::Constant(true));
    }

    #[test]
    fn fork_follows_tree_structure() {
        let rule = RuleNode::and(vec![
            RuleNode::leaf("id", "in", "integer", "1,2"),
            RuleNode::default(),
            RuleNode::or(vec![
                RuleNode::leaf("price", "less", "double", 3.5),
                RuleNode::unary("price", "is_null", "double"),
            ]),
        ]);
        assert_eq!(
            text(&rule),
            "((id IN (1, 2)) AND ((price < 3.5) OR (price IS NULL)))"
        );
    }

    #[test]
    fn single_child_fork_is_unwrapped() {
        let rule = RuleNode::or(vec![RuleNode::leaf("id", "equal", "integer", 4)]);
        assert_eq!(text(&rule), "(id == 4)");
    }

    #[test]
    fn strings_fold_unless_case_sensitive() {
        let rule = RuleNode::leaf("name", "equal", "string", "Bob");
        assert_eq!(text(&rule), "(lower(name) == \"bob\")");
        let options = CompileOptions::default().with_case_sensitive_strings(true);
        let expr = compile::<Item>(Some(&rule), &options).unwrap();
        assert_eq!(expr.to_string(), "(name == \"Bob\")");
    }

    #[test]
    fn negation_wraps_quantifier() {
        let rule = RuleNode::leaf("tags.label", "not_equal", "string", "x");
        assert_eq!(text(&rule), "(NOT ANY(tags, (lower(label) == \"x\")))");
    }

    #[test]
    fn non_nullable_null_checks_fold() {
        assert_eq!(text(&RuleNode::unary("id", "is_null", "integer")), "false");
        assert_eq!(text(&RuleNode::unary("id", "is_not_null", "integer")), "true");
    }

    #[test]
    fn missing_slots() {
        let mut rule = RuleNode::leaf("id", "equal", "integer", 1);
        rule.ty = None;
        let err = compile::<Item>(Some(&rule), &CompileOptions::default()).unwrap_err();
        assert_eq!(
            err,
            FilterError::Configuration(ConfigurationError::IncompleteRule { missing: "type" })
        );
    }

    #[test]
    fn unknown_type_wins_over_unknown_operator() {
        let rule = RuleNode::leaf("id", "near", "decimal", 1);
        let err = compile::<Item>(Some(&rule), &CompileOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            FilterError::Configuration(ConfigurationError::UnknownType { .. })
        ));
    }

    #[test]
    fn unknown_operator() {
        let rule = RuleNode::leaf("id", "near", "integer", 1);
        let err = compile::<Item>(Some(&rule), &CompileOptions::default()).unwrap_err();
        assert_eq!(
            err,
            FilterError::Configuration(ConfigurationError::UnknownOperator {
                operator: "near".into()
            })
        );
    }

    #[test]
    fn plan_binds_other_values() {
        let options = CompileOptions::default();
        let first = RuleNode::leaf("id", "equal", "integer", 1);
        let second = RuleNode::leaf("id", "equal", "integer", 2);
        let plan = plan::<Item>(Some(&first), &options).unwrap();
        let coercer = Coercer::default();
        let expr = bind(&plan, Some(&second), &options, &coercer).unwrap();
        assert_eq!(expr.to_string(), "(id == 2)");
    }

    #[test]
    fn bind_rejects_shorter_tree() {
        let options = CompileOptions::default();
        let wide = RuleNode::and(vec![
            RuleNode::leaf("id", "equal", "integer", 1),
            RuleNode::leaf("id", "equal", "integer", 2),
        ]);
        let narrow = RuleNode::and(vec![RuleNode::leaf("id", "equal", "integer", 1)]);
        let plan = plan::<Item>(Some(&wide), &options).unwrap();
        assert!(bind(&plan, Some(&narrow), &options, &Coercer::default()).is_err());
    }
}
