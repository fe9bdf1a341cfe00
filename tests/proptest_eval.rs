
use proptest::prelude::*;
use rulefilter::{build_predicate, CompileOptions, Literal, Locale, RawValue, RuleNode};
use strategies::{arb_sample, Sample};

fn arb_raw_value() -> impl Strategy<Value = RawValue> {
    let scalar = prop_oneof![
        any::<bool>().prop_map(RawValue::Bool),
        any::<i64>().prop_map(RawValue::Int),
        any::<f64>()
            .prop_filter("must be finite", |f| f.is_finite())
            .prop_map(RawValue::Float),
        "[\\[\\]a-z0-9,.' \"-]{0,12}".prop_map(RawValue::Text),
    ];
    scalar.prop_recursive(2, 8, 3, |inner| prop::collection::vec(inner, 0..4).prop_map(RawValue::List))
}

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id".to_owned()),
        Just("status".to_owned()),
        Just("score".to_owned()),
        Just("tags".to_owned()),
        Just("tags.x".to_owned()),
        "[a-z_.]{0,8}",
    ]
}

proptest! {
    /// Arbitrary leaves either fail to build or evaluate, and never panic.
    #[test]
    fn build_never_panics(
        field in arb_name(),
        operator in "[a-z_]{0,16}",
        ty in prop::sample::select(&["integer", "long", "double", "string", "date", "datetime", "boolean", "guid", "money"][..]),
        value in prop::option::of(arb_raw_value()),
        sample in arb_sample(),
    ) {
        let rule = RuleNode {
            field: Some(field),
            operator: Some(operator),
            ty: Some(ty.to_owned()),
            value,
            ..RuleNode::default()
        };
        if let Ok(filter) = build_predicate::<Sample>(Some(&rule), &CompileOptions::default()) {
            let _ = filter.evaluate(&sample);
            let _ = filter.debug_text();
        }
    }

    /// Canonicalization never panics, and never splits outside multi-valued use.
    #[test]
    fn canonicalize_total(value in arb_raw_value()) {
        let locale = Locale::invariant();
        let single = Literal::canonicalize(Some(&value), false, &locale);
        let split = Literal::canonicalize(Some(&value), true, &locale);
        if !matches!(value, RawValue::List(_)) {
            prop_assert_eq!(single.len(), 1);
        }
        prop_assert!(split.len() >= single.len() || split.is_empty());
    }

    /// Numeric comparisons agree with Rust's own operators.
    #[test]
    fn id_comparisons_match_reference(bound in 0_i64..=20, sample in arb_sample()) {
        let options = CompileOptions::default();
        let cases: [(&str, fn(i64, i64) -> bool); 6] = [
            ("equal", |a, b| a == b),
            ("not_equal", |a, b| a != b),
            ("less", |a, b| a < b),
            ("less_or_equal", |a, b| a <= b),
            ("greater", |a, b| a > b),
            ("greater_or_equal", |a, b| a >= b),
        ];
        for (op, reference) in cases {
            let rule = RuleNode::leaf("id", op, "long", bound);
            let filter = build_predicate::<Sample>(Some(&rule), &options).unwrap();
            prop_assert_eq!(filter.evaluate(&sample), Ok(reference(sample.id, bound)), "{}", op);
        }
    }

    /// `between` is inclusive on both ends.
    #[test]
    fn between_matches_reference(a in 0_i64..=20, b in 0_i64..=20, sample in arb_sample()) {
        let rule = RuleNode::leaf("id", "between", "long", vec![a, b]);
        let filter = build_predicate::<Sample>(Some(&rule), &CompileOptions::default()).unwrap();
        prop_assert_eq!(filter.evaluate(&sample), Ok(a <= sample.id && sample.id <= b));
    }
}
