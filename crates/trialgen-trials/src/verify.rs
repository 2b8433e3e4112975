//! Post-hoc checks over an instantiated or reloaded block.

use serde::{Deserialize, Serialize};
use trialgen_core::{SingletonPresence, TrialCategory, TrialRecord};
use trialgen_ga::SequenceDesign;

use crate::config::ExperimentConfig;
use crate::jitter::group_mean_difference;

/// Which optional checks run and their tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyOptions {
    /// Longest allowed run of singleton-present trials.
    pub max_consecutive_sp: Option<usize>,
    /// Expected share of singleton-present trials.
    pub prop_sp: Option<f64>,
    /// Allowed absolute deviation from `prop_sp`.
    pub prop_tolerance: f64,
    /// Allowed difference between jitter group means.
    pub jitter_tolerance: f64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_consecutive_sp: None,
            prop_sp: None,
            prop_tolerance: 0.05,
            jitter_tolerance: 0.001,
        }
    }
}

impl VerifyOptions {
    /// Options matching what `config` asked the generator for.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        let (prop_sp, max_consecutive_sp) = match &config.optimizer.design {
            SequenceDesign::SingletonPresence {
                prop_sp,
                max_consecutive_sp,
            } => (*prop_sp, Some(*max_consecutive_sp)),
            SequenceDesign::Priming { .. } => (config.singleton.prop_sp, None),
        };
        Self {
            max_consecutive_sp,
            prop_sp: Some(prop_sp),
            jitter_tolerance: config.jitter.tolerance,
            ..Self::default()
        }
    }
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Stable check name.
    pub name: String,
    /// Whether the check held.
    pub passed: bool,
    /// Short description of what was found.
    pub detail: String,
}

/// All checks run over one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Trials inspected.
    pub trials: usize,
    /// Check results in execution order.
    pub checks: Vec<CheckResult>,
}

impl VerificationReport {
    /// True when every check passed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Checks that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|check| !check.passed)
    }

    /// Looks a check up by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.name == name)
    }
}

fn result(name: &str, offending: &[usize]) -> CheckResult {
    let detail = if offending.is_empty() {
        "ok".to_string()
    } else {
        let shown: Vec<String> = offending.iter().take(10).map(usize::to_string).collect();
        let more = if offending.len() > 10 { ", ..." } else { "" };
        format!("{} violation(s) at [{}{more}]", offending.len(), shown.join(", "))
    };
    CheckResult {
        name: name.to_string(),
        passed: offending.is_empty(),
        detail,
    }
}

/// Runs every applicable check over `records`.
pub fn verify_sequence(records: &[TrialRecord], options: &VerifyOptions) -> VerificationReport {
    let mut checks = Vec::new();

    let priming: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(index, record)| {
            let previous = index.checked_sub(1).map(|p| &records[p].condition);
            match record.label.category {
                TrialCategory::Control => false,
                TrialCategory::PositivePriming => {
                    previous.map_or(true, |prev| prev.target != record.condition.target)
                }
                TrialCategory::NegativePriming => {
                    previous.map_or(true, |prev| prev.singleton != Some(record.condition.target))
                }
            }
        })
        .map(|(index, _)| index)
        .collect();
    checks.push(result("priming-relations", &priming));

    let malformed: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            !record.condition.is_well_formed()
                || record.condition.presence() != record.label.presence
        })
        .map(|(index, _)| index)
        .collect();
    checks.push(result("within-trial-integrity", &malformed));

    let adjacent: Vec<usize> = records
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].label.category.is_priming() && pair[1].label.category.is_priming())
        .map(|(index, _)| index + 1)
        .collect();
    checks.push(result("no-adjacent-priming", &adjacent));

    let first: Vec<usize> = match records.first() {
        Some(record) if record.label.category != TrialCategory::Control => vec![0],
        _ => Vec::new(),
    };
    checks.push(result("control-first", &first));

    let presence: Vec<SingletonPresence> = records.iter().map(TrialRecord::presence).collect();

    if let Some(cap) = options.max_consecutive_sp {
        let mut offending = Vec::new();
        let mut run = 0usize;
        for (index, flag) in presence.iter().enumerate() {
            run = if flag.is_present() { run + 1 } else { 0 };
            if run > cap {
                offending.push(index);
            }
        }
        checks.push(result("sp-run-cap", &offending));
    }

    if let Some(prop) = options.prop_sp.filter(|_| !records.is_empty()) {
        let present = presence.iter().filter(|flag| flag.is_present()).count();
        let share = present as f64 / records.len() as f64;
        let deviation = (share - prop).abs();
        checks.push(CheckResult {
            name: "sp-proportion".to_string(),
            passed: deviation <= options.prop_tolerance,
            detail: format!("share {share:.3}, expected {prop:.3}"),
        });
    }

    let durations: [(&str, fn(&TrialRecord) -> Option<f64>); 2] = [
        ("iti-jitter-balance", |record: &TrialRecord| record.iti_jitter),
        ("cue-jitter-balance", |record: &TrialRecord| {
            record.cue_stim_delay_jitter
        }),
    ];
    for (name, field) in durations {
        let values: Option<Vec<f64>> = records.iter().map(field).collect();
        let Some(values) = values.filter(|values| !values.is_empty()) else {
            continue;
        };
        let difference = group_mean_difference(&presence, &values);
        checks.push(CheckResult {
            name: name.to_string(),
            passed: difference < options.jitter_tolerance,
            detail: format!("group mean difference {difference:.4}"),
        });
    }

    VerificationReport {
        trials: records.len(),
        checks,
    }
}
