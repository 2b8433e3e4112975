use proptest::prelude::*;
use trialgen_core::{RngHandle, TrialCategory};
use trialgen_ga::variation::repair_adjacency;
use trialgen_ga::{optimize, GaConfig, SequenceDesign};

fn priming_constraints(num_trials: usize) -> trialgen_ga::ConstraintSet {
    GaConfig {
        num_trials,
        ..GaConfig::default()
    }
    .constraints()
    .unwrap()
}

#[test]
fn default_search_leaves_no_priming_pairs_at_session_length() {
    for seed in [3u64, 17, 2024] {
        let config = GaConfig::default();
        assert_eq!(config.num_trials, 225);
        let summary = optimize(&config, seed).unwrap();
        assert_eq!(summary.fitness.adjacency_violations, 0, "seed {seed}");
        assert!(!summary.fitness.anchor_violated, "seed {seed}");
        assert!(summary
            .labels
            .windows(2)
            .all(|pair| !(pair[0].category.is_priming() && pair[1].category.is_priming())));
        assert_eq!(summary.labels[0].category, TrialCategory::Control);
    }
}

#[test]
fn default_search_leaves_no_priming_pairs_over_five_hundred_trials() {
    let config = GaConfig {
        num_trials: 500,
        ..GaConfig::default()
    };
    let summary = optimize(&config, 8).unwrap();
    assert_eq!(summary.labels.len(), 500);
    assert_eq!(summary.fitness.adjacency_violations, 0);
}

#[test]
fn swap_repair_keeps_category_counts() {
    let constraints = priming_constraints(8);
    let mut genome = vec![0u8, 1, 2, 0, 0, 0, 0, 0];
    let before = constraints.counts(&genome);
    let mut rng = RngHandle::from_seed(5);

    let edits = repair_adjacency(&mut genome, &constraints, &mut rng);

    assert_eq!(edits, 1);
    assert_eq!(constraints.adjacency_violations(&genome), 0);
    assert_eq!(constraints.counts(&genome), before);
    assert_eq!(genome[0], 0);
}

#[test]
fn clean_genome_is_left_alone() {
    let constraints = priming_constraints(6);
    let mut genome = vec![0u8, 1, 0, 2, 0, 0];
    let mut rng = RngHandle::from_seed(9);
    assert_eq!(repair_adjacency(&mut genome, &constraints, &mut rng), 0);
    assert_eq!(genome, vec![0u8, 1, 0, 2, 0, 0]);
}

#[test]
fn search_without_repair_still_runs() {
    let config = GaConfig {
        num_trials: 12,
        num_generations: 50,
        repair_adjacency: false,
        ..GaConfig::default()
    };
    let summary = optimize(&config, 1).unwrap();
    assert_eq!(summary.labels.len(), 12);
}

proptest! {
    #[test]
    fn repaired_priming_genomes_have_no_violations(
        genome in proptest::collection::vec(0u8..3, 2..80),
        seed in any::<u64>(),
    ) {
        let constraints = priming_constraints(genome.len());
        let mut genome = genome;
        let mut rng = RngHandle::from_seed(seed);
        repair_adjacency(&mut genome, &constraints, &mut rng);
        prop_assert_eq!(constraints.adjacency_violations(&genome), 0);
        prop_assert_eq!(genome[0], 0);
    }

    #[test]
    fn repaired_presence_genomes_respect_the_run_cap(
        genome in proptest::collection::vec(0u8..2, 1..80),
        seed in any::<u64>(),
    ) {
        let constraints = GaConfig {
            num_trials: genome.len(),
            design: SequenceDesign::SingletonPresence {
                prop_sp: 0.7,
                max_consecutive_sp: 3,
            },
            ..GaConfig::default()
        }
        .constraints()
        .unwrap();
        let mut genome = genome;
        let len = genome.len();
        let mut rng = RngHandle::from_seed(seed);
        repair_adjacency(&mut genome, &constraints, &mut rng);
        prop_assert_eq!(constraints.adjacency_violations(&genome), 0);
        prop_assert_eq!(genome.len(), len);
    }
}
