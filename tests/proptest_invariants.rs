
use proptest::prelude::*;
use rulefilter::{build_predicate, Combinator, CompileOptions, NodeKind, RuleNode};
use strategies::{arb_negatable_leaf, arb_rule, arb_sample, arb_text_leaf, negated, Sample};

fn eval(rule: &RuleNode, sample: &Sample, options: &CompileOptions) -> bool {
    build_predicate::<Sample>(Some(rule), options)
        .unwrap()
        .evaluate(sample)
        .unwrap()
}

/// Evaluate a tree leaf by leaf, combining results by hand. `None` for nodes
/// that contribute nothing.
fn reference(rule: &RuleNode, sample: &Sample, options: &CompileOptions) -> Option<bool> {
    match rule.kind() {
        NodeKind::Empty => None,
        NodeKind::Leaf(leaf) => Some(eval(leaf, sample, options)),
        NodeKind::Fork {
            combinator,
            children,
        } => {
            let results: Vec<bool> = children
                .iter()
                .filter_map(|child| reference(child, sample, options))
                .collect();
            if results.is_empty() {
                return None;
            }
            Some(match combinator {
                Combinator::And => results.iter().all(|r| *r),
                Combinator::Or => results.iter().any(|r| *r),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 1: Determinism
//
// Compiling the same tree twice yields the same condition and verdicts.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn determinism(rule in arb_rule(), sample in arb_sample()) {
        let options = CompileOptions::default();
        let first = build_predicate::<Sample>(Some(&rule), &options).unwrap();
        let second = build_predicate::<Sample>(Some(&rule), &options).unwrap();
        prop_assert_eq!(first.debug_text(), second.debug_text());
        prop_assert_eq!(first.evaluate(&sample), second.evaluate(&sample));
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Tree semantics
//
// A fork is the conjunction or disjunction of its non-empty children; an
// empty tree matches everything.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn forks_combine_children(rule in arb_rule(), sample in arb_sample()) {
        let options = CompileOptions::default();
        let expected = reference(&rule, &sample, &options).unwrap_or(true);
        prop_assert_eq!(eval(&rule, &sample, &options), expected);
    }

    #[test]
    fn empty_children_are_ignored(rule in arb_rule(), sample in arb_sample()) {
        let options = CompileOptions::default();
        let padded = RuleNode::and(vec![RuleNode::default(), rule.clone(), RuleNode::default()]);
        prop_assert_eq!(eval(&padded, &sample, &options), eval(&rule, &sample, &options));
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Complementarity
//
// Every negated operator accepts exactly the records its positive form
// rejects, nulls and collections included.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn negation_is_complement(rule in arb_negatable_leaf(), sample in arb_sample()) {
        let options = CompileOptions::default();
        let negative = negated(&rule).unwrap();
        prop_assert_eq!(
            eval(&negative, &sample, &options),
            !eval(&rule, &sample, &options),
            "{:?} vs {:?}", rule.operator, negative.operator
        );
    }
}

// ---------------------------------------------------------------------------
// Invariant 4: Case sensitivity
//
// An exact text match is also a case-insensitive one.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn exact_matches_are_folded_matches(rule in arb_text_leaf(), sample in arb_sample()) {
        let exact = CompileOptions::default().with_case_sensitive_strings(true);
        if eval(&rule, &sample, &exact) {
            prop_assert!(eval(&rule, &sample, &CompileOptions::default()));
        }
    }
}
