use trialgen_ga::{evaluate, AdjacencyRule, FitnessBounds, GaConfig, SequenceDesign};

#[test]
fn ideal_sequence_scores_one() {
    let config = GaConfig {
        num_trials: 10,
        ..GaConfig::default()
    };
    let constraints = config.constraints().unwrap();
    let bounds = FitnessBounds::for_constraints(&constraints, 10);
    // C NP C PP C C NP C PP C
    let genome = vec![0, 1, 0, 2, 0, 0, 1, 0, 2, 0];
    let fitness = evaluate(&genome, &constraints, &bounds);
    assert_eq!(fitness.raw, 0.0);
    assert_eq!(fitness.normalized, 1.0);
    assert!(!fitness.has_rule_violations());
}

#[test]
fn adjacency_and_anchor_are_charged_at_full_weight() {
    let config = GaConfig {
        num_trials: 4,
        design: SequenceDesign::Priming {
            prop_c: 0.5,
            prop_np: 0.25,
            prop_pp: 0.25,
            anchor_control: true,
        },
        ..GaConfig::default()
    };
    let constraints = config.constraints().unwrap();
    let bounds = FitnessBounds::for_constraints(&constraints, 4);
    // NP PP C C: one adjacent priming pair and a missing anchor.
    let fitness = evaluate(&[1, 2, 0, 0], &constraints, &bounds);
    assert_eq!(fitness.adjacency_violations, 1);
    assert!(fitness.anchor_violated);
    assert_eq!(fitness.proportion_penalty, 0.0);
    assert_eq!(fitness.raw, -2000.0);
}

#[test]
fn worst_case_bound_is_reachable() {
    let config = GaConfig {
        num_trials: 5,
        ..GaConfig::default()
    };
    let constraints = config.constraints().unwrap();
    let bounds = FitnessBounds::for_constraints(&constraints, 5);
    // All NP: 4 adjacent pairs, no anchor, every trial in a 1-trial category.
    let fitness = evaluate(&[1, 1, 1, 1, 1], &constraints, &bounds);
    assert_eq!(fitness.raw, bounds.min);
    assert_eq!(fitness.normalized, 0.0);
}

#[test]
fn degenerate_bounds_normalise_to_zero() {
    let bounds = FitnessBounds { max: 0.0, min: 0.0 };
    assert_eq!(bounds.normalize(0.0), 0.0);
}

#[test]
fn max_run_counts_each_trial_beyond_cap() {
    let rule = AdjacencyRule::MaxRun { gene: 1, max_run: 2 };
    assert_eq!(rule.violations(&[1, 1, 1, 1, 0, 1, 1]), 2);
    assert_eq!(rule.worst_case(7), 5);
}

#[test]
fn invalid_proportions_are_rejected() {
    let config = GaConfig {
        design: SequenceDesign::Priming {
            prop_c: 0.5,
            prop_np: 0.2,
            prop_pp: 0.2,
            anchor_control: true,
        },
        ..GaConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert_eq!(err.info().code, "ga-proportion-sum");
}

#[test]
fn run_caps_must_name_design_labels() {
    let yaml = r#"
num_trials: 20
run_caps:
  - label: C_SP
    max_run: 3
"#;
    let err = GaConfig::from_yaml_str(yaml).unwrap_err();
    assert_eq!(err.info().code, "ga-run-cap");

    let yaml = r#"
num_trials: 20
run_caps:
  - label: C
    max_run: 3
"#;
    let config = GaConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.constraints().unwrap().rules.len(), 2);
}

#[test]
fn yaml_defaults_match_documented_values() {
    let config = GaConfig::from_yaml_str("num_trials: 50\n").unwrap();
    assert_eq!(config.rule_violation_factor, 1000.0);
    assert_eq!(config.num_generations, 3000);
    assert_eq!(config.sol_per_pop, 200);
    assert_eq!(config.keep_parents, 2);
    assert_eq!(config.fitness_threshold, 0.9999);
    assert_eq!(config.genes_to_mutate(), 3);
}
