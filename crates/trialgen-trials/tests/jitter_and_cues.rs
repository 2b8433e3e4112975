use trialgen_core::rng::streams;
use trialgen_core::{CueInstruction, RngHandle, SingletonPresence};
use trialgen_trials::cues::longest_run;
use trialgen_trials::jitter::group_mean_difference;
use trialgen_trials::{assign_cues, balanced_jitter, CueConfig, CueStrategy, JitterParams};

fn presence(pattern: &[u8]) -> Vec<SingletonPresence> {
    pattern
        .iter()
        .map(|flag| SingletonPresence::from_bool(*flag == 1))
        .collect()
}

fn mixed(n: usize) -> Vec<SingletonPresence> {
    (0..n)
        .map(|index| SingletonPresence::from_bool(index % 3 != 0))
        .collect()
}

#[test]
fn jitter_groups_are_balanced_and_bounded() {
    let flags = mixed(60);
    let params = JitterParams {
        spread: 0.25,
        tolerance: 0.005,
        max_attempts: 100_000,
    };
    let mut rng = RngHandle::substream(7, streams::ITI_JITTER);
    let outcome = balanced_jitter(&flags, 1.2, &params, &mut rng);
    assert!(outcome.balanced);
    assert_eq!(outcome.values.len(), 60);
    assert!(outcome.mean_difference < 0.005);
    assert!((group_mean_difference(&flags, &outcome.values) - outcome.mean_difference).abs() < 1e-12);
    for value in &outcome.values {
        assert!(*value >= 0.9 - 1e-9 && *value <= 1.5 + 1e-9, "{value} out of range");
        assert!(((value * 1000.0).round() - value * 1000.0).abs() < 1e-6);
    }
}

#[test]
fn single_group_is_accepted_on_first_draw() {
    let flags = presence(&[1, 1, 1, 1]);
    let params = JitterParams {
        spread: 0.25,
        tolerance: 1e-9,
        max_attempts: 10,
    };
    let outcome = balanced_jitter(&flags, 1.0, &params, &mut RngHandle::from_seed(1));
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.balanced);
}

#[test]
fn zero_spread_yields_the_base_duration() {
    let flags = presence(&[1, 0, 1, 0]);
    let params = JitterParams {
        spread: 0.0,
        tolerance: 0.001,
        max_attempts: 5,
    };
    let outcome = balanced_jitter(&flags, 0.8, &params, &mut RngHandle::from_seed(2));
    assert_eq!(outcome.values, vec![0.8; 4]);
}

fn count(cues: &[CueInstruction], cue: CueInstruction) -> usize {
    cues.iter().filter(|value| **value == cue).count()
}

#[test]
fn trial_wise_cues_split_informative_share() {
    let config = CueConfig::default();
    let flags = mixed(40);
    let assignment = assign_cues(
        CueStrategy::for_subject(2),
        1,
        &flags,
        &config,
        &mut RngHandle::from_seed(3),
    );
    let cues = &assignment.cues;
    assert_eq!(cues.len(), 40);
    assert_eq!(count(cues, CueInstruction::CueTargetLocation), 16);
    assert_eq!(count(cues, CueInstruction::CueDistractorLocation), 16);
    assert_eq!(count(cues, CueInstruction::CueNeutral), 8);
    if assignment.within_cap {
        for cue in [
            CueInstruction::CueTargetLocation,
            CueInstruction::CueDistractorLocation,
            CueInstruction::CueNeutral,
        ] {
            assert!(longest_run(cues, cue) <= config.max_consecutive_trial_cues);
        }
    }
}

#[test]
fn block_wise_cues_alternate_by_block() {
    let config = CueConfig::default();
    let flags = mixed(30);
    let strategy = CueStrategy::for_subject(5);
    assert_eq!(strategy, CueStrategy::BlockWise);

    let odd = assign_cues(strategy, 1, &flags, &config, &mut RngHandle::from_seed(4));
    assert_eq!(count(&odd.cues, CueInstruction::CueTargetLocation), 24);
    assert_eq!(count(&odd.cues, CueInstruction::CueDistractorLocation), 0);

    let even = assign_cues(strategy, 2, &flags, &config, &mut RngHandle::from_seed(4));
    assert_eq!(count(&even.cues, CueInstruction::CueTargetLocation), 0);
    assert_eq!(count(&even.cues, CueInstruction::CueDistractorLocation), 16);
    for (cue, flag) in even.cues.iter().zip(&flags) {
        if !flag.is_present() {
            assert_eq!(*cue, CueInstruction::CueNeutral);
        }
    }
    if even.within_cap {
        assert!(longest_run(&even.cues, CueInstruction::CueDistractorLocation) <= 5);
    }
}

#[test]
fn longest_run_counts_consecutive_cues() {
    use CueInstruction::*;
    let cues = [CueNeutral, CueTargetLocation, CueTargetLocation, CueNeutral, CueTargetLocation];
    assert_eq!(longest_run(&cues, CueTargetLocation), 2);
    assert_eq!(longest_run(&cues, CueDistractorLocation), 0);
}
