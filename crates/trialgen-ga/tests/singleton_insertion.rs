use trialgen_core::{TrialCategory, TrialLabel};
use trialgen_ga::{insert_singleton_present, GapHistogram, SingletonInsertion};

fn labels(codes: &[&str]) -> Vec<TrialLabel> {
    codes.iter().map(|code| code.parse().unwrap()).collect()
}

fn sample_sequence() -> Vec<TrialLabel> {
    let pattern = ["C", "NP", "C", "C", "PP", "C", "C", "NP", "C", "PP"];
    labels(&pattern.repeat(4))
}

#[test]
fn trials_before_negative_priming_are_forced_present() {
    let sequence = sample_sequence();
    let outcome = insert_singleton_present(&sequence, &SingletonInsertion::default(), 17).unwrap();
    for (index, pair) in sequence.windows(2).enumerate() {
        if pair[1].category == TrialCategory::NegativePriming {
            assert!(outcome.labels[index].presence.is_present(), "index {index}");
        }
    }
    assert_eq!(outcome.forced_indices, vec![0, 6, 10, 16, 20, 26, 30, 36]);
}

#[test]
fn quota_is_met_and_categories_are_untouched() {
    let sequence = sample_sequence();
    let params = SingletonInsertion {
        prop_sp: 0.5,
        max_attempts: 200,
    };
    let outcome = insert_singleton_present(&sequence, &params, 3).unwrap();
    assert_eq!(outcome.present_indices.len(), 20);
    assert_eq!(outcome.labels.len(), sequence.len());
    for (before, after) in sequence.iter().zip(outcome.labels.iter()) {
        assert_eq!(before.category, after.category);
    }
    let flagged = outcome
        .labels
        .iter()
        .filter(|label| label.presence.is_present())
        .count();
    assert_eq!(flagged, 20);
}

#[test]
fn accepted_draws_pass_the_modal_gap_check() {
    let outcome =
        insert_singleton_present(&sample_sequence(), &SingletonInsertion::default(), 8).unwrap();
    if outcome.validated {
        assert!(outcome.gaps.is_irregular());
    }
    assert_eq!(outcome.gaps.total() + 1, outcome.present_indices.len());
}

#[test]
fn insertion_is_deterministic_per_seed() {
    let sequence = sample_sequence();
    let params = SingletonInsertion::default();
    let a = insert_singleton_present(&sequence, &params, 99).unwrap();
    let b = insert_singleton_present(&sequence, &params, 99).unwrap();
    assert_eq!(a, b);
}

#[test]
fn forced_trials_beyond_quota_are_kept() {
    let sequence = labels(&["C", "NP", "C", "NP", "C", "NP"]);
    let params = SingletonInsertion {
        prop_sp: 0.2,
        max_attempts: 5,
    };
    let outcome = insert_singleton_present(&sequence, &params, 1).unwrap();
    assert_eq!(outcome.present_indices, vec![0, 2, 4]);
    // every gap is 2, so the check cannot pass
    assert!(!outcome.validated);
    assert_eq!(outcome.attempts, 5);
}

#[test]
fn modal_gap_check_compares_top_three() {
    let regular = GapHistogram::from_indices(&[0, 2, 4, 6, 8, 11]);
    assert_eq!(regular.ranked()[0], (2, 4));
    assert!(!regular.is_irregular());

    let mixed = GapHistogram::from_indices(&[0, 2, 5, 9, 11, 14, 18]);
    assert!(mixed.is_irregular());

    assert!(GapHistogram::from_indices(&[4]).is_irregular());
}

#[test]
fn out_of_range_share_is_rejected() {
    let params = SingletonInsertion {
        prop_sp: 1.5,
        max_attempts: 10,
    };
    let err = insert_singleton_present(&sample_sequence(), &params, 0).unwrap_err();
    assert_eq!(err.info().code, "singleton-prop");
}
