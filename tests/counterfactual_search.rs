//! Counterfactual Search Tests
//!
//! - Each axis reports at most its first outcome-flipping delta
//! - Only the changed feature differs from the original input
//! - Domains are applied before the rule is consulted
//! - The search is stateless and safe to share across threads

use std::sync::Arc;
use std::thread;

use fairtrail::counterfactual::{
    search, CounterfactualError, CounterfactualSearch, DecisionRule, Domain, FeatureAxis,
    LinearCreditRule, SearchSpace,
};
use fairtrail::decision_log::FeatureMap;

// =============================================================================
// Test Utilities
// =============================================================================

fn features(pairs: &[(&str, f64)]) -> FeatureMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn denied_applicant() -> FeatureMap {
    features(&[
        ("income", 25_000.0),
        ("age", 24.0),
        ("credit_score", 580.0),
        ("spending_ratio", 0.65),
    ])
}

fn approved_applicant() -> FeatureMap {
    features(&[
        ("income", 130_000.0),
        ("credit_score", 580.0),
        ("spending_ratio", 0.65),
    ])
}

// =============================================================================
// Default Space
// =============================================================================

#[test]
fn test_denied_applicant_needs_more_income() {
    let rule = LinearCreditRule::default();
    let original = denied_applicant();
    assert_eq!(rule.decide(&original), "denied");

    let results = search(&original, &rule).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].changed_feature, "income");
    assert_eq!(results[0].delta, 105_000.0);
    assert_eq!(results[0].new_input["income"], 130_000.0);
    assert_eq!(results[0].new_output, "approved");
}

#[test]
fn test_only_changed_feature_differs() {
    let original = denied_applicant();
    let results = search(&original, &LinearCreditRule::default()).unwrap();

    for result in &results {
        assert_eq!(result.new_input.len(), original.len());
        for (name, value) in &original {
            if *name != result.changed_feature {
                assert_eq!(result.new_input[name], *value, "feature {}", name);
            }
        }
    }
}

#[test]
fn test_approved_applicant_flips_on_lower_credit_score() {
    let results = search(&approved_applicant(), &LinearCreditRule::default()).unwrap();

    // Income deltas only raise the score; spending deltas only lower the ratio
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].changed_feature, "credit_score");
    assert_eq!(results[0].delta, -200.0);
    assert_eq!(results[0].new_input["credit_score"], 380.0);
    assert_eq!(results[0].new_output, "denied");
}

#[test]
fn test_absent_features_are_not_searched() {
    let results = search(&features(&[("age", 30.0)]), &LinearCreditRule::default()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_non_finite_input_rejected() {
    let mut input = denied_applicant();
    input.insert("income".into(), f64::INFINITY);

    let err = search(&input, &LinearCreditRule::default()).unwrap_err();
    assert!(matches!(err, CounterfactualError::Validation(_)));
    assert_eq!(err.status_code(), 400);
}

// =============================================================================
// Custom Spaces and Rules
// =============================================================================

#[test]
fn test_first_flipping_delta_wins() {
    let space = SearchSpace::new(vec![FeatureAxis::new(
        "score",
        vec![1.0, 5.0, 10.0, 20.0],
        Domain::NonNegative,
    )]);
    let rule = |f: &FeatureMap| {
        if f["score"] >= 8.0 {
            "pass".to_string()
        } else {
            "fail".to_string()
        }
    };

    let results = CounterfactualSearch::new(space)
        .search(&features(&[("score", 4.0)]), &rule)
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].delta, 5.0);
    assert_eq!(results[0].new_input["score"], 9.0);
}

#[test]
fn test_domain_clamps_before_deciding() {
    let space = SearchSpace::new(vec![
        FeatureAxis::new("balance", vec![-500.0], Domain::NonNegative),
        FeatureAxis::new("ratio", vec![-1.0], Domain::PositiveOr(0.01)),
    ]);
    let rule = |f: &FeatureMap| {
        if f["balance"] == 0.0 || f["ratio"] == 0.01 {
            "flagged".to_string()
        } else {
            "ok".to_string()
        }
    };

    let results = CounterfactualSearch::new(space)
        .search(&features(&[("balance", 100.0), ("ratio", 0.5)]), &rule)
        .unwrap();

    let names: Vec<&str> = results.iter().map(|r| r.changed_feature.as_str()).collect();
    assert_eq!(names, vec!["balance", "ratio"]);
    assert_eq!(results[0].new_input["balance"], 0.0);
    assert_eq!(results[1].new_input["ratio"], 0.01);
}

#[test]
fn test_concurrent_searches_agree() {
    let search = Arc::new(CounterfactualSearch::default());
    let rule: Arc<dyn DecisionRule> = Arc::new(LinearCreditRule::default());
    let expected = search.search(&denied_applicant(), rule.as_ref()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let search = Arc::clone(&search);
            let rule = Arc::clone(&rule);
            thread::spawn(move || search.search(&denied_applicant(), rule.as_ref()).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
