use std::fs;

use tempfile::tempdir;
use trialgen_core::{CueInstruction, DistractorProb, RngHandle, TrialLabel, TrialgenError};
use trialgen_trials::{
    instantiate, read_sequence_csv, write_sequence_csv, ConditionPool, InstantiateOptions,
};

#[test]
fn pool_survives_csv_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pool.csv");
    let pool = ConditionPool::enumerate(5, 3).unwrap();
    pool.write_csv(&path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let header = contents.lines().next().unwrap();
    assert_eq!(
        header,
        "SingletonPresent,TargetDigit,TargetLoc,SingletonDigit,SingletonLoc,\
         Non-Singleton1Digit,Non-Singleton1Loc,Non-Singleton2Digit,Non-Singleton2Loc"
    );
    let reloaded = ConditionPool::read_csv(&path).unwrap();
    assert_eq!(reloaded, pool);
}

#[test]
fn absent_rows_use_zero_for_the_singleton() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pool.csv");
    ConditionPool::enumerate(3, 2).unwrap().write_csv(&path).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    let absent = contents
        .lines()
        .skip(1)
        .find(|line| line.starts_with('0'))
        .unwrap();
    let fields: Vec<&str> = absent.split(',').collect();
    assert_eq!(&fields[3..5], &["0", "0"]);
    assert_ne!(fields[5], "0");
}

#[test]
fn missing_pool_file_is_a_pool_error() {
    let dir = tempdir().unwrap();
    let err = ConditionPool::read_csv(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, TrialgenError::Pool(ref info) if info.code == "pool-missing"));
}

#[test]
fn duplicate_digits_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        "SingletonPresent,TargetDigit,TargetLoc,SingletonDigit,SingletonLoc,Non-Singleton1Digit,Non-Singleton1Loc\n\
         1,4,1,4,2,0,0\n",
    )
    .unwrap();
    let err = ConditionPool::read_csv(&path).unwrap_err();
    match err {
        TrialgenError::Pool(info) => assert!(info.code.starts_with("pool-row")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn sequence_file_restores_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub-1_block_0.csv");
    let pool = ConditionPool::enumerate(9, 3).unwrap();
    let labels: Vec<TrialLabel> = ["C_SP", "NP", "C", "PP_SP", "C"]
        .iter()
        .map(|raw| raw.parse().unwrap())
        .collect();
    let mut records = instantiate(
        &labels,
        &pool,
        &InstantiateOptions::default(),
        &mut RngHandle::from_seed(12),
    )
    .unwrap()
    .records;
    records[0].iti_jitter = Some(1.125);
    records[0].cue_instruction = Some(CueInstruction::CueDistractorLocation);
    records[0].distractor_prob = Some(DistractorProb::LowProbability);
    records[2].iti_jitter = Some(0.8);

    write_sequence_csv(&records, 3, &path).unwrap();
    let reloaded = read_sequence_csv(&path).unwrap();
    assert_eq!(reloaded, records);

    let header = fs::read_to_string(&path).unwrap();
    assert!(header
        .lines()
        .next()
        .unwrap()
        .ends_with("Label,Priming,DistractorProb,CueInstruction,ITI-Jitter,cue_stim_delay_jitter"));
}

#[test]
fn unknown_label_reports_the_row() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("seq.csv");
    fs::write(
        &path,
        "SingletonPresent,TargetDigit,TargetLoc,SingletonDigit,SingletonLoc,Non-Singleton1Digit,Non-Singleton1Loc,Label\n\
         0,1,1,0,0,2,2,XX\n",
    )
    .unwrap();
    let err = read_sequence_csv(&path).unwrap_err();
    assert_eq!(err.info().code, "label-parse");
    assert_eq!(err.info().context.get("row").map(String::as_str), Some("0"));
}
