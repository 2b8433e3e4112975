use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trialgen_core::errors::ErrorInfo;
use trialgen_core::{RngHandle, SingletonPresence, TrialCategory, TrialLabel, TrialgenError};

use crate::determinism;
use crate::metrics::GapHistogram;

/// Parameters of the singleton-presence pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingletonInsertion {
    /// Target share of singleton-present trials.
    #[serde(default = "default_prop_sp")]
    pub prop_sp: f64,
    /// Attempts before accepting an unvalidated draw.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_prop_sp() -> f64 {
    0.5
}

fn default_max_attempts() -> usize {
    1000
}

impl Default for SingletonInsertion {
    fn default() -> Self {
        Self {
            prop_sp: default_prop_sp(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl SingletonInsertion {
    /// Rejects out-of-range settings.
    pub fn validate(&self) -> Result<(), TrialgenError> {
        if !(0.0..=1.0).contains(&self.prop_sp) {
            return Err(TrialgenError::config(
                "singleton-prop",
                "prop_sp must lie in [0, 1]",
                "prop_sp",
                self.prop_sp,
            ));
        }
        if self.max_attempts == 0 {
            return Err(TrialgenError::Config(ErrorInfo::new(
                "singleton-attempts",
                "max_attempts must be positive",
            )));
        }
        Ok(())
    }

    /// Number of singleton-present trials requested for `num_trials`.
    pub fn target_count(&self, num_trials: usize) -> usize {
        ((self.prop_sp * num_trials as f64).floor() as usize).min(num_trials)
    }
}

/// Labels with singleton presence assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingletonOutcome {
    /// Labels with presence flags set.
    pub labels: Vec<TrialLabel>,
    /// Positions flagged singleton-present, ascending.
    pub present_indices: Vec<usize>,
    /// Positions forced because an NP trial follows them.
    pub forced_indices: Vec<usize>,
    /// Distances between consecutive present trials.
    pub gaps: GapHistogram,
    /// Whether the gap distribution passed the modal-gap check.
    pub validated: bool,
    /// Attempts used.
    pub attempts: usize,
}

/// Assigns singleton presence to a priming label sequence.
///
/// Every trial directly before a negative priming trial is made
/// singleton-present, the rest of the quota is drawn at random from the other
/// positions, and the draw is repeated until no single gap length dominates.
pub fn insert_singleton_present(
    labels: &[TrialLabel],
    params: &SingletonInsertion,
    seed: u64,
) -> Result<SingletonOutcome, TrialgenError> {
    params.validate()?;
    let target = params.target_count(labels.len());
    let forced: Vec<usize> = labels
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| {
            pair[1].category == TrialCategory::NegativePriming
                && pair[0].category != TrialCategory::NegativePriming
        })
        .map(|(index, _)| index)
        .collect();
    if forced.len() > target {
        warn!(
            forced = forced.len(),
            quota = target,
            "more trials precede NP than the singleton quota allows, keeping all of them"
        );
    }
    let forced_set: BTreeSet<usize> = forced.iter().copied().collect();
    let free: Vec<usize> = (0..labels.len())
        .filter(|index| !forced_set.contains(index))
        .collect();
    let remaining = target.saturating_sub(forced.len()).min(free.len());

    let mut last: Option<(Vec<usize>, GapHistogram)> = None;
    for attempt in 0..params.max_attempts {
        let mut rng = RngHandle::from_seed(determinism::singleton_seed(seed, attempt));
        let mut present: Vec<usize> = forced
            .iter()
            .copied()
            .chain(free.choose_multiple(&mut rng, remaining).copied())
            .collect();
        present.sort_unstable();
        let gaps = GapHistogram::from_indices(&present);
        if gaps.is_irregular() {
            info!(
                attempt = attempt + 1,
                gaps = ?gaps.ranked(),
                "singleton gap distribution accepted"
            );
            return Ok(finish(labels, present, forced, gaps, true, attempt + 1));
        }
        last = Some((present, gaps));
    }

    let (present, gaps) = last.unwrap_or_default();
    warn!(
        attempts = params.max_attempts,
        gaps = ?gaps.ranked(),
        "no singleton placement passed the gap check, keeping the last draw"
    );
    Ok(finish(labels, present, forced, gaps, false, params.max_attempts))
}

fn finish(
    labels: &[TrialLabel],
    present: Vec<usize>,
    forced: Vec<usize>,
    gaps: GapHistogram,
    validated: bool,
    attempts: usize,
) -> SingletonOutcome {
    let present_set: BTreeSet<usize> = present.iter().copied().collect();
    let labels = labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            label.with_presence(SingletonPresence::from_bool(present_set.contains(&index)))
        })
        .collect();
    SingletonOutcome {
        labels,
        present_indices: present,
        forced_indices: forced,
        gaps,
        validated,
        attempts,
    }
}
