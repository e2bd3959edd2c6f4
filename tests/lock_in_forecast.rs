use std::collections::HashMap;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use lockin::ensemble::ForecastMatrix;
use lockin::scenario::Scenario;
use lockin::{
    ConditionalProbabilityTable, LockInForecast, LogisticAnchor, UnitPolicy, aggregate_odds,
    evaluate_cpt,
};

const YEARS: [i32; 5] = [2030, 2055, 2080, 2105, 2130];

const AGI_SOURCES: [[f64; 5]; 6] = [
    [0.08, 0.297, 0.432, 0.567, 0.702],
    [0.12, 0.601, 0.756, 0.911, 0.9999],
    [0.6572, 0.9334, 0.9603, 0.9697, 0.9745],
    [0.4183, 0.8478, 0.9002, 0.9279, 0.9552],
    [0.1, 0.5324, 0.8027, 0.9999, 0.9999],
    [0.31, 0.648, 0.738, 0.828, 0.918],
];

const ALIGNMENT_ESTIMATES: [f64; 11] = [0.4, 0.15, 0.75, 0.65, 0.75, 0.7, 0.95, 0.5, 0.001, 0.3, 0.8];

const PUBLISHED_LOCK_IN: [f64; 5] = [0.100166737, 0.185443159, 0.222653915, 0.25758476, 0.276148467];

fn demo_scenario() -> Scenario {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/lock_in.toml");
    Scenario::load(&path).expect("load demo scenario")
}

fn published_marginals() -> HashMap<String, Vec<f64>> {
    [
        ("agi", vec![0.234123, 0.684444, 0.809520, 0.962057, 0.991274]),
        (
            "misalignment",
            vec![0.39715637, 0.43708259, 0.46858015, 0.49230160, 0.50954967],
        ),
        ("wwiii", vec![0.3000, 0.3144, 0.3861, 0.4579, 0.5297]),
        (
            "whole_brain_emulation",
            vec![0.0653, 0.402, 0.5218, 0.599, 0.6549],
        ),
        (
            "stable_totalitarianism",
            vec![0.000288, 0.000405, 0.000539, 0.000689, 0.000861],
        ),
        (
            "world_government",
            vec![0.0048, 0.0161, 0.04, 0.0639, 0.0752],
        ),
    ]
    .into_iter()
    .map(|(name, values)| (name.to_string(), values))
    .collect()
}

fn factor_names() -> Vec<String> {
    [
        "agi",
        "misalignment",
        "wwiii",
        "whole_brain_emulation",
        "stable_totalitarianism",
        "world_government",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

#[test]
fn agi_consensus_matches_published_series() {
    let rows: Vec<Vec<f64>> = AGI_SOURCES.iter().map(|row| row.to_vec()).collect();
    let consensus = ForecastMatrix::from_rows(&rows)
        .unwrap()
        .geometric_mean_odds(UnitPolicy::Reject)
        .unwrap();
    let published = [0.234123, 0.684444, 0.809520, 0.962057, 0.991274];
    for (got, expected) in consensus.iter().zip(published) {
        assert_abs_diff_eq!(*got, expected, epsilon = 1e-6);
    }
}

#[test]
fn misalignment_curve_matches_published_series() {
    let anchor = aggregate_odds(&ALIGNMENT_ESTIMATES, UnitPolicy::Reject).unwrap();
    assert_abs_diff_eq!(anchor, 0.4569291966960345, epsilon = 1e-12);

    let curve = LogisticAnchor::new(2070, anchor, 0.0161).unwrap();
    let expected = [0.39715637, 0.43708259, 0.46858015, 0.49230160, 0.50954967];
    for (point, expected) in curve.forecast(&YEARS).iter().zip(expected) {
        assert_abs_diff_eq!(point.probability, expected, epsilon = 1e-8);
    }
}

#[test]
fn additive_table_reproduces_published_lock_in() {
    let cpt = ConditionalProbabilityTable::from_additive_weights(factor_names(), &[0.1; 6]).unwrap();
    let result = evaluate_cpt(&published_marginals(), &cpt).unwrap();
    for (got, expected) in result.iter().zip(PUBLISHED_LOCK_IN) {
        assert_abs_diff_eq!(*got, expected, epsilon = 1e-6);
    }
}

#[test]
fn explicit_table_agrees_with_additive_table() {
    let names = factor_names();
    let entries = (0..64usize).map(|index| {
        let assignment: Vec<bool> = (0..6).map(|bit| index & (1 << bit) != 0).collect();
        let probability = 0.1 * assignment.iter().filter(|&&on| on).count() as f64;
        (assignment, probability)
    });
    let explicit = ConditionalProbabilityTable::from_entries(names.clone(), entries).unwrap();
    let additive = ConditionalProbabilityTable::from_additive_weights(names, &[0.1; 6]).unwrap();
    assert_eq!(explicit.len(), 64);

    let marginals = published_marginals();
    let from_explicit = evaluate_cpt(&marginals, &explicit).unwrap();
    let from_additive = evaluate_cpt(&marginals, &additive).unwrap();
    for (a, b) in from_explicit.iter().zip(&from_additive) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn outcome_rises_across_the_horizon() {
    let cpt = ConditionalProbabilityTable::from_additive_weights(factor_names(), &[0.1; 6]).unwrap();
    let report = LockInForecast::new(YEARS.to_vec())
        .unwrap()
        .generate("lock_in", &published_marginals(), &cpt)
        .unwrap();
    assert!(
        report
            .outcome_probabilities
            .windows(2)
            .all(|pair| pair[0] < pair[1])
    );
    assert!(
        report
            .outcome_probabilities
            .iter()
            .all(|&p| (0.0..=0.6).contains(&p))
    );
}

#[test]
fn demo_scenario_reproduces_published_lock_in() {
    let scenario = demo_scenario();
    assert_eq!(scenario.years, YEARS.to_vec());

    let report = scenario.run().unwrap();
    assert_eq!(report.outcome, "lock_in");
    assert_eq!(report.factors.len(), 6);
    assert_eq!(report.factors[1].name, "misalignment");

    let published = published_marginals();
    for name in ["stable_totalitarianism", "world_government"] {
        let series = report
            .factors
            .iter()
            .find(|f| f.name == name)
            .expect("declared factor");
        assert_eq!(series.values, published[name]);
    }
    for (got, expected) in report.outcome_probabilities.iter().zip(PUBLISHED_LOCK_IN) {
        assert_abs_diff_eq!(*got, expected, epsilon = 1e-6);
    }
}
