use std::fs;

use tempfile::tempdir;
use trialgen_core::{block_seed, DistractorProb, TrialgenError};
use trialgen_ga::{GaConfig, RunManifest, SequenceDesign};
use trialgen_trials::{
    generate_block, read_sequence_csv, run_subject, verify_sequence, BiasConfig, ConditionPool,
    ControlExclusion, CueConfig, ExperimentConfig, SessionConfig, SubjectLayout, VerifyOptions,
};

fn small_config() -> ExperimentConfig {
    ExperimentConfig {
        session: SessionConfig {
            n_trials: 24,
            n_blocks: 2,
            ..SessionConfig::default()
        },
        optimizer: GaConfig {
            num_generations: 300,
            sol_per_pop: 40,
            ..GaConfig::default()
        },
        ..ExperimentConfig::default()
    }
}

#[test]
fn generated_block_is_consistent_and_reproducible() {
    let config = small_config();
    let pool = ConditionPool::enumerate(9, 3).unwrap();
    let seed = block_seed(config.seed_policy.master_seed, 4, 0);
    let first = generate_block(&config, &pool, 4, 0, seed).unwrap();
    let second = generate_block(&config, &pool, 4, 0, seed).unwrap();

    assert_eq!(first.records, second.records);
    assert_eq!(first.records.len(), 24);
    assert!(first.singleton.is_some());
    assert!(first.records.iter().all(|r| r.iti_jitter.is_some()));
    assert!(first.records.iter().all(|r| r.cue_instruction.is_none()));
    assert_eq!(first.traits.total, 24);
    assert_eq!(first.sp_gaps.total() + 1, first.traits.singleton_present);

    let report = verify_sequence(&first.records, &VerifyOptions::from_config(&config));
    for name in ["priming-relations", "within-trial-integrity", "control-first"] {
        assert!(report.check(name).unwrap().passed, "{name}");
    }
}

#[test]
fn singleton_design_skips_the_priming_pass() {
    let mut config = small_config();
    config.optimizer.design = SequenceDesign::SingletonPresence {
        prop_sp: 0.5,
        max_consecutive_sp: 4,
    };
    config.bias = Some(BiasConfig::default());
    config.cues = Some(CueConfig::default());
    config.jitter.cue_stim_delay = Some(0.5);
    let pool = ConditionPool::enumerate(9, 3).unwrap();
    let outcome = generate_block(&config, &pool, 3, 1, 99).unwrap();

    assert!(outcome.singleton.is_none());
    assert!(outcome.records.iter().all(|r| r.priming() == 0));
    assert!(outcome.records.iter().all(|r| r.distractor_prob.is_some()));
    assert!(outcome.records.iter().all(|r| r.cue_instruction.is_some()));
    assert!(outcome.records.iter().all(|r| r.cue_stim_delay_jitter.is_some()));
}

#[test]
fn pool_with_wrong_role_count_is_rejected() {
    let config = small_config();
    let pool = ConditionPool::enumerate(5, 4).unwrap();
    let err = generate_block(&config, &pool, 1, 0, 1).unwrap_err();
    assert!(matches!(err, TrialgenError::Pool(ref info) if info.code == "pool-roles"));
}

#[test]
fn run_subject_writes_every_artifact() {
    let dir = tempdir().unwrap();
    let config = small_config();
    let pool = ConditionPool::enumerate(9, 3).unwrap();
    let layout = SubjectLayout::prepare(dir.path(), 7).unwrap();
    let outcomes = run_subject(&config, &pool, &layout, 0).unwrap();
    assert_eq!(outcomes.len(), 2);

    for block in 0..2 {
        let records = read_sequence_csv(&layout.block_csv(block)).unwrap();
        assert_eq!(records.len(), 24);
        assert!(layout.fitness_csv(block).is_file());
        assert!(layout.sp_gaps_csv(block).is_file());
        assert!(layout.c_gaps_csv(block).is_file());
        let manifest = RunManifest::load(&layout.manifest_json(block)).unwrap();
        assert_eq!(manifest.config.num_trials, 24);
    }
    assert!(layout.block_csv(0).ends_with("sub-7/sub-7_block_0.csv"));
    let log = fs::read_to_string(layout.sequence_log()).unwrap();
    assert!(log.contains("subject 7 block 0"));
    assert!(log.contains("subject 7 block 1"));

    let again = run_subject(&config, &pool, &SubjectLayout::open(dir.path(), 7).unwrap(), 1);
    assert!(matches!(again, Err(TrialgenError::Layout(_))));
}

#[test]
fn existing_subject_directory_is_a_layout_error() {
    let dir = tempdir().unwrap();
    let subject = dir.path().join("sub-2");
    fs::create_dir_all(&subject).unwrap();
    fs::write(subject.join("notes.txt"), "taken").unwrap();
    let err = SubjectLayout::prepare(dir.path(), 2).unwrap_err();
    assert!(matches!(err, TrialgenError::Layout(ref info) if info.code == "layout-not-empty"));

    let empty = dir.path().join("sub-3");
    fs::create_dir_all(&empty).unwrap();
    let layout = SubjectLayout::prepare(dir.path(), 3).unwrap();
    assert!(layout.logs_dir().is_dir());
}

#[test]
fn subject_with_only_a_run_log_can_be_prepared_again() {
    let dir = tempdir().unwrap();
    let layout = SubjectLayout::prepare(dir.path(), 5).unwrap();
    let log = layout.logs_dir().join("trialgen.log");
    fs::write(&log, "block 0 failed\n").unwrap();

    let again = SubjectLayout::prepare(dir.path(), 5).unwrap();
    assert_eq!(again, layout);
    assert_eq!(fs::read_to_string(&log).unwrap(), "block 0 failed\n");

    fs::write(layout.block_csv(0), "index\n").unwrap();
    let err = SubjectLayout::prepare(dir.path(), 5).unwrap_err();
    assert!(matches!(err, TrialgenError::Layout(ref info) if info.code == "layout-not-empty"));
}

#[test]
fn experiment_config_reads_yaml() {
    let yaml = r#"
session:
  n_trials: 30
  n_blocks: 3
optimizer:
  design:
    type: priming
    prop_c: 0.6
    prop_np: 0.2
    prop_pp: 0.2
  num_generations: 500
control: relations
bias:
  hp_distractor: 0.8
seed_policy:
  master_seed: 17
"#;
    let config = ExperimentConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.session.n_trials, 30);
    assert_eq!(config.ga_config().num_trials, 30);
    assert_eq!(config.ga_config().seed_policy.master_seed, 17);
    assert_eq!(config.bias.unwrap().odd_subject_location, 3);
    assert!(config.cues.is_none());

    let bad = "session:\n  n_locations: 4\n  n_digits: 3\n";
    let err = ExperimentConfig::from_yaml_str(bad).unwrap_err();
    assert_eq!(err.info().code, "session-digits");
}

#[test]
fn default_control_mode_honours_the_distractor_bias() {
    let mut config = small_config();
    config.session.n_trials = 225;
    config.optimizer.design = SequenceDesign::SingletonPresence {
        prop_sp: 0.7,
        max_consecutive_sp: 5,
    };
    config.bias = Some(BiasConfig {
        hp_distractor: 0.7,
        ..BiasConfig::default()
    });
    assert_eq!(config.control, ControlExclusion::Strict);
    assert_eq!(config.control_exclusion(), ControlExclusion::Relations);
    let pool = ConditionPool::enumerate(9, 3).unwrap();

    let mut present = 0usize;
    let mut high = 0usize;
    for subject in 1..=4u32 {
        let seed = block_seed(config.seed_policy.master_seed, subject, 0);
        let outcome = generate_block(&config, &pool, subject, 0, seed).unwrap();
        for record in &outcome.records {
            match record.distractor_prob {
                Some(DistractorProb::HighProbability) => {
                    present += 1;
                    high += 1;
                }
                Some(DistractorProb::LowProbability) => present += 1,
                _ => {}
            }
        }
    }
    let share = high as f64 / present as f64;
    assert!((share - 0.7).abs() < 0.08, "high-probability share {share}");
}
