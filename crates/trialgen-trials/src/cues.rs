//! Spatial cue assignment for cued designs.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;
use trialgen_core::{CueInstruction, SingletonPresence};

use crate::config::CueConfig;

/// How cue types are distributed over a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CueStrategy {
    /// Target, distractor and neutral cues mixed within every block.
    TrialWise,
    /// One informative cue type per block, alternating by block number.
    BlockWise,
}

impl CueStrategy {
    /// Even subjects get trial-wise cues, odd subjects block-wise cues.
    pub fn for_subject(subject_id: u32) -> Self {
        if subject_id % 2 == 0 {
            CueStrategy::TrialWise
        } else {
            CueStrategy::BlockWise
        }
    }
}

/// Cues for one block.
#[derive(Debug, Clone, PartialEq)]
pub struct CueAssignment {
    /// One cue per trial.
    pub cues: Vec<CueInstruction>,
    /// Shuffles used.
    pub attempts: usize,
    /// Whether the run caps held for the kept shuffle.
    pub within_cap: bool,
}

/// Longest run of `cue` in `cues`.
pub fn longest_run(cues: &[CueInstruction], cue: CueInstruction) -> usize {
    let mut best = 0;
    let mut current = 0;
    for value in cues {
        if *value == cue {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

fn informative_count(prop: f64, trials: usize) -> usize {
    ((prop * trials as f64).round() as usize).min(trials)
}

/// Assigns cues for `block` given each trial's singleton presence.
pub fn assign_cues<R: Rng + ?Sized>(
    strategy: CueStrategy,
    block: u32,
    presence: &[SingletonPresence],
    config: &CueConfig,
    rng: &mut R,
) -> CueAssignment {
    match strategy {
        CueStrategy::TrialWise => trial_wise(presence.len(), config, rng),
        CueStrategy::BlockWise if block % 2 == 1 => {
            block_wise_target(presence.len(), config, rng)
        }
        CueStrategy::BlockWise => block_wise_distractor(presence, config, rng),
    }
}

fn trial_wise<R: Rng + ?Sized>(trials: usize, config: &CueConfig, rng: &mut R) -> CueAssignment {
    let informative = informative_count(config.prop_informative, trials);
    let target = informative / 2;
    let distractor = informative - target;
    let mut cues = Vec::with_capacity(trials);
    cues.extend(std::iter::repeat(CueInstruction::CueTargetLocation).take(target));
    cues.extend(std::iter::repeat(CueInstruction::CueDistractorLocation).take(distractor));
    cues.extend(std::iter::repeat(CueInstruction::CueNeutral).take(trials - informative));

    let cap = config.max_consecutive_trial_cues;
    shuffle_until(cues, config.max_shuffle_attempts, rng, |cues| {
        [
            CueInstruction::CueTargetLocation,
            CueInstruction::CueDistractorLocation,
            CueInstruction::CueNeutral,
        ]
        .into_iter()
        .all(|cue| longest_run(cues, cue) <= cap)
    })
}

fn block_wise_target<R: Rng + ?Sized>(trials: usize, config: &CueConfig, rng: &mut R) -> CueAssignment {
    let informative = informative_count(config.prop_informative, trials);
    let mut cues = vec![CueInstruction::CueNeutral; trials];
    cues[..informative].fill(CueInstruction::CueTargetLocation);
    let cap = config.max_consecutive_block_cues;
    shuffle_until(cues, config.max_shuffle_attempts, rng, |cues| {
        longest_run(cues, CueInstruction::CueTargetLocation) <= cap
    })
}

fn block_wise_distractor<R: Rng + ?Sized>(
    presence: &[SingletonPresence],
    config: &CueConfig,
    rng: &mut R,
) -> CueAssignment {
    let present: Vec<usize> = presence
        .iter()
        .enumerate()
        .filter(|(_, flag)| flag.is_present())
        .map(|(index, _)| index)
        .collect();
    let informative = informative_count(config.prop_informative, present.len());
    let mut pool = vec![CueInstruction::CueNeutral; present.len()];
    pool[..informative].fill(CueInstruction::CueDistractorLocation);

    let cap = config.max_consecutive_block_cues;
    let place = |shuffled: &[CueInstruction]| {
        let mut cues = vec![CueInstruction::CueNeutral; presence.len()];
        for (index, cue) in present.iter().zip(shuffled) {
            cues[*index] = *cue;
        }
        cues
    };
    let assignment = shuffle_until(pool, config.max_shuffle_attempts, rng, |shuffled| {
        longest_run(&place(shuffled), CueInstruction::CueDistractorLocation) <= cap
    });
    CueAssignment {
        cues: place(&assignment.cues),
        ..assignment
    }
}

fn shuffle_until<R, F>(mut cues: Vec<CueInstruction>, max_attempts: usize, rng: &mut R, accept: F) -> CueAssignment
where
    R: Rng + ?Sized,
    F: Fn(&[CueInstruction]) -> bool,
{
    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        cues.shuffle(rng);
        if accept(&cues) {
            return CueAssignment {
                cues,
                attempts: attempt,
                within_cap: true,
            };
        }
    }
    warn!(attempts = max_attempts, "cue run cap not met, keeping last shuffle");
    CueAssignment {
        cues,
        attempts: max_attempts,
        within_cap: false,
    }
}
