//! Concrete trial conditions and instantiated trial records.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::label::{SingletonPresence, TrialLabel};

/// Digit and loudspeaker location assigned to one role within a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Spoken digit.
    pub digit: u8,
    /// Loudspeaker index (1-based).
    pub location: u8,
}

impl Placement {
    /// Creates a placement.
    pub const fn new(digit: u8, location: u8) -> Self {
        Self { digit, location }
    }
}

/// One row of the exhaustively enumerated condition pool.
///
/// Roles are numbered the way the pool file numbers them: role 0 is the
/// target, role 1 is the singleton when present and the first non-singleton
/// otherwise, and every later role is a non-singleton.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateCondition {
    /// Target placement.
    pub target: Placement,
    /// Singleton placement, `None` when the singleton is absent.
    pub singleton: Option<Placement>,
    /// Remaining roles in role order.
    pub non_singletons: Vec<Placement>,
}

impl CandidateCondition {
    /// Presence flag derived from the singleton slot.
    pub fn presence(&self) -> SingletonPresence {
        SingletonPresence::from_bool(self.singleton.is_some())
    }

    /// Role index of the first non-singleton.
    pub fn first_non_singleton_role(&self) -> usize {
        if self.singleton.is_some() {
            2
        } else {
            1
        }
    }

    /// Iterates `(role, placement)` pairs for the non-singleton roles.
    pub fn non_singleton_roles(&self) -> impl Iterator<Item = (usize, Placement)> + '_ {
        let first = self.first_non_singleton_role();
        self.non_singletons
            .iter()
            .enumerate()
            .map(move |(offset, placement)| (first + offset, *placement))
    }

    /// Iterates every placement in role order.
    pub fn placements(&self) -> impl Iterator<Item = Placement> + '_ {
        std::iter::once(self.target)
            .chain(self.singleton)
            .chain(self.non_singletons.iter().copied())
    }

    /// Digits pairwise distinct and locations pairwise distinct.
    pub fn is_well_formed(&self) -> bool {
        let mut digits = BTreeSet::new();
        let mut locations = BTreeSet::new();
        self.placements()
            .all(|placement| digits.insert(placement.digit) && locations.insert(placement.location))
    }
}

/// Bias tag describing where the singleton was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistractorProb {
    /// No singleton in the trial.
    DistractorAbsent,
    /// Singleton at the subject's biased location.
    HighProbability,
    /// Singleton at one of the other locations.
    LowProbability,
}

impl DistractorProb {
    /// Label written to the sequence file.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistractorProb::DistractorAbsent => "distractor-absent",
            DistractorProb::HighProbability => "high-probability",
            DistractorProb::LowProbability => "low-probability",
        }
    }

    /// Parses the label written by [`DistractorProb::as_str`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "distractor-absent" => Some(DistractorProb::DistractorAbsent),
            "high-probability" => Some(DistractorProb::HighProbability),
            "low-probability" => Some(DistractorProb::LowProbability),
            _ => None,
        }
    }
}

impl Display for DistractorProb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spatial cue shown before the stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueInstruction {
    /// Cue points at the upcoming target location.
    CueTargetLocation,
    /// Cue points at the upcoming distractor location.
    CueDistractorLocation,
    /// Uninformative cue.
    CueNeutral,
}

impl CueInstruction {
    /// Label written to the sequence file.
    pub fn as_str(&self) -> &'static str {
        match self {
            CueInstruction::CueTargetLocation => "cue_target_location",
            CueInstruction::CueDistractorLocation => "cue_distractor_location",
            CueInstruction::CueNeutral => "cue_neutral",
        }
    }

    /// Parses the label written by [`CueInstruction::as_str`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "cue_target_location" => Some(CueInstruction::CueTargetLocation),
            "cue_distractor_location" => Some(CueInstruction::CueDistractorLocation),
            "cue_neutral" => Some(CueInstruction::CueNeutral),
            _ => None,
        }
    }
}

impl Display for CueInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully instantiated trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Position within the block.
    pub index: usize,
    /// Effective label after self-corrections.
    pub label: TrialLabel,
    /// Sampled condition.
    pub condition: CandidateCondition,
    /// Distractor bias tag, when bias is configured.
    pub distractor_prob: Option<DistractorProb>,
    /// Cue instruction, when cues are configured.
    pub cue_instruction: Option<CueInstruction>,
    /// Inter-trial interval jitter in seconds.
    pub iti_jitter: Option<f64>,
    /// Cue to stimulus delay jitter in seconds.
    pub cue_stim_delay_jitter: Option<f64>,
}

impl TrialRecord {
    /// Numeric priming tag of the record.
    pub fn priming(&self) -> i8 {
        self.label.category.priming()
    }

    /// Presence flag of the sampled condition.
    pub fn presence(&self) -> SingletonPresence {
        self.condition.presence()
    }
}
