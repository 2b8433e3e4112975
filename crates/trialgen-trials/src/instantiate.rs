//! Per-position condition sampling driven by the label sequence.
//!
//! Each position filters the pool against the previous trial's
//! [`SequenceState`] and samples one surviving row. Label sequences that
//! cannot be realised as given are corrected in place and every correction
//! is reported; only a priming label without a usable predecessor aborts.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trialgen_core::errors::ErrorInfo;
use trialgen_core::{
    format_labels, CandidateCondition, TrialCategory, TrialLabel, TrialRecord, TrialgenError,
};

use crate::bias::DistractorBias;
use crate::config::ControlExclusion;
use crate::pool::ConditionPool;
use crate::state::SequenceState;

/// Knobs of one instantiation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InstantiateOptions {
    /// Exclusion applied to Control trials.
    pub control: ControlExclusion,
    /// Distractor-location bias for singleton-present trials.
    pub bias: Option<DistractorBias>,
}

/// Why a position was not instantiated exactly as labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionKind {
    /// The first trial must be a Control trial with a singleton.
    FirstTrialControl,
    /// An NP label directly after another NP label.
    ConsecutiveNegativePriming,
    /// No pool row has the requested presence.
    PresenceUnavailable,
    /// The strict Control exclusion left nothing and was relaxed.
    ControlRelaxed,
}

/// One self-correction applied while instantiating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Position in the block.
    pub index: usize,
    /// Label before the correction.
    pub from: TrialLabel,
    /// Label after the correction.
    pub to: TrialLabel,
    /// Rule that fired.
    pub kind: CorrectionKind,
}

/// Instantiated block plus the corrections that were needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Instantiation {
    /// One record per input label.
    pub records: Vec<TrialRecord>,
    /// Corrections in position order.
    pub corrections: Vec<Correction>,
}

impl Instantiation {
    /// Effective labels after correction.
    pub fn labels(&self) -> Vec<TrialLabel> {
        self.records.iter().map(|record| record.label).collect()
    }
}

/// Samples one pool row per label.
///
/// Jitter and cue fields are left empty; later passes fill them.
pub fn instantiate<R: Rng + ?Sized>(
    labels: &[TrialLabel],
    pool: &ConditionPool,
    options: &InstantiateOptions,
    rng: &mut R,
) -> Result<Instantiation, TrialgenError> {
    if pool.is_empty() {
        return Err(TrialgenError::Pool(ErrorInfo::new(
            "pool-empty",
            "condition pool has no rows",
        )));
    }

    let mut state = SequenceState::default();
    let mut records = Vec::with_capacity(labels.len());
    let mut corrections = Vec::new();

    for (index, requested) in labels.iter().copied().enumerate() {
        let mut label = requested;
        let mut correct = |label: &mut TrialLabel, to: TrialLabel, kind: CorrectionKind| {
            let from = *label;
            warn!(index, from = %from, to = %to, ?kind, "label corrected");
            corrections.push(Correction {
                index,
                from,
                to,
                kind,
            });
            *label = to;
        };

        if index == 0 && label.category != TrialCategory::Control {
            correct(
                &mut label,
                TrialLabel::present(TrialCategory::Control),
                CorrectionKind::FirstTrialControl,
            );
        } else if label.category == TrialCategory::NegativePriming
            && index > 0
            && labels[index - 1].category == TrialCategory::NegativePriming
        {
            let downgraded = TrialLabel::new(TrialCategory::Control, label.presence);
            correct(&mut label, downgraded, CorrectionKind::ConsecutiveNegativePriming);
        }
        if !pool.has_presence(label.presence) {
            let flipped = label.with_presence(label.presence.flipped());
            correct(&mut label, flipped, CorrectionKind::PresenceUnavailable);
        }

        let subset: Vec<&CandidateCondition> = pool.subset(label.presence).collect();
        let mut candidates = match label.category {
            TrialCategory::Control => {
                let (rows, relaxed) = control_candidates(subset, &state, options.control);
                if relaxed {
                    let unchanged = label;
                    correct(&mut label, unchanged, CorrectionKind::ControlRelaxed);
                }
                rows
            }
            TrialCategory::NegativePriming => {
                let prev_singleton = state
                    .prev_singleton
                    .ok_or_else(|| {
                        infeasible(
                            index,
                            label,
                            &state,
                            labels,
                            "negative priming needs a singleton on the previous trial",
                        )
                    })?;
                subset
                    .into_iter()
                    .filter(|row| row.target == prev_singleton)
                    .collect()
            }
            TrialCategory::PositivePriming => {
                let prev_target = state
                    .prev_target
                    .ok_or_else(|| {
                        infeasible(index, label, &state, labels, "positive priming needs a previous trial")
                    })?;
                subset
                    .into_iter()
                    .filter(|row| row.target == prev_target)
                    .collect()
            }
        };

        if let Some(bias) = options.bias.filter(|_| label.presence.is_present()) {
            candidates = bias.restrict(candidates, rng);
        }

        let Some(choice) = candidates.choose(rng).copied() else {
            return Err(infeasible(
                index,
                label,
                &state,
                labels,
                "no pool row satisfies the label",
            ));
        };
        debug!(index, label = %label, candidates = candidates.len(), "trial sampled");

        records.push(TrialRecord {
            index,
            label,
            condition: choice.clone(),
            distractor_prob: options.bias.map(|bias| bias.tag(choice)),
            cue_instruction: None,
            iti_jitter: None,
            cue_stim_delay_jitter: None,
        });
        state.advance(choice);
    }

    Ok(Instantiation {
        records,
        corrections,
    })
}

/// Rows a Control trial may use, and whether the strict filter was relaxed.
fn control_candidates<'a>(
    subset: Vec<&'a CandidateCondition>,
    state: &SequenceState,
    mode: ControlExclusion,
) -> (Vec<&'a CandidateCondition>, bool) {
    if mode == ControlExclusion::Strict {
        let strict: Vec<&CandidateCondition> = subset
            .iter()
            .copied()
            .filter(|row| !repeats_any_field(row, state) && !repeats_relation(row, state))
            .collect();
        if !strict.is_empty() {
            return (strict, false);
        }
    }
    let relaxed = subset
        .into_iter()
        .filter(|row| !repeats_relation(row, state))
        .collect();
    (relaxed, mode == ControlExclusion::Strict)
}

/// Any target or singleton field equal to the previous trial's counterpart.
pub fn repeats_any_field(row: &CandidateCondition, state: &SequenceState) -> bool {
    let target = state.prev_target.is_some_and(|prev| {
        row.target.digit == prev.digit || row.target.location == prev.location
    });
    let singleton = match (row.singleton, state.prev_singleton) {
        (Some(current), Some(prev)) => {
            current.digit == prev.digit || current.location == prev.location
        }
        _ => false,
    };
    target || singleton
}

/// Whole-placement priming or repetition relations with the previous trial.
pub fn repeats_relation(row: &CandidateCondition, state: &SequenceState) -> bool {
    let target = Some(row.target);
    let positive = state.prev_target.is_some() && target == state.prev_target;
    let negative = state.prev_singleton.is_some() && target == state.prev_singleton;
    let attended = row.singleton.is_some() && row.singleton == state.prev_target;
    let ignored = row.singleton.is_some() && row.singleton == state.prev_singleton;
    positive || negative || attended || ignored
}

fn infeasible(
    index: usize,
    label: TrialLabel,
    state: &SequenceState,
    labels: &[TrialLabel],
    message: &str,
) -> TrialgenError {
    let window = &labels[index.saturating_sub(2)..(index + 1).min(labels.len())];
    TrialgenError::Infeasible(
        ErrorInfo::new("label-infeasible", message)
            .with_context("index", index.to_string())
            .with_context("label", label.to_string())
            .with_context("previous", state.describe())
            .with_context("window", format_labels(window))
            .with_hint("insert a singleton-present trial before every NP trial"),
    )
}
