//! Trial category labels produced by the optimizer.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, TrialgenError};

/// Priming role of a trial relative to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrialCategory {
    /// No intended relation to the previous trial.
    Control,
    /// Target takes over the previous trial's singleton.
    NegativePriming,
    /// Target repeats the previous trial's target.
    PositivePriming,
}

impl TrialCategory {
    /// Short code used in labels and CSV files.
    pub fn code(&self) -> &'static str {
        match self {
            TrialCategory::Control => "C",
            TrialCategory::NegativePriming => "NP",
            TrialCategory::PositivePriming => "PP",
        }
    }

    /// Numeric priming tag written to the sequence output.
    pub fn priming(&self) -> i8 {
        match self {
            TrialCategory::Control => 0,
            TrialCategory::NegativePriming => -1,
            TrialCategory::PositivePriming => 1,
        }
    }

    /// Inverse of [`TrialCategory::priming`].
    pub fn from_priming(value: i8) -> Option<Self> {
        match value {
            0 => Some(TrialCategory::Control),
            -1 => Some(TrialCategory::NegativePriming),
            1 => Some(TrialCategory::PositivePriming),
            _ => None,
        }
    }

    /// Whether the category belongs to the restricted priming set.
    pub fn is_priming(&self) -> bool {
        !matches!(self, TrialCategory::Control)
    }
}

/// Whether a singleton distractor is part of the trial.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum SingletonPresence {
    /// A singleton distractor is played.
    Present,
    /// No singleton distractor.
    #[default]
    Absent,
}

impl SingletonPresence {
    /// Returns `true` for [`SingletonPresence::Present`].
    pub fn is_present(&self) -> bool {
        matches!(self, SingletonPresence::Present)
    }

    /// Builds a presence flag from a boolean.
    pub fn from_bool(present: bool) -> Self {
        if present {
            SingletonPresence::Present
        } else {
            SingletonPresence::Absent
        }
    }

    /// Returns the opposite presence.
    pub fn flipped(&self) -> Self {
        Self::from_bool(!self.is_present())
    }
}

/// Category plus presence flag, rendered as `C`, `C_SP`, `NP`, `PP_SP`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialLabel {
    /// Priming role.
    pub category: TrialCategory,
    /// Singleton presence.
    pub presence: SingletonPresence,
}

impl TrialLabel {
    /// Creates a label from its parts.
    pub const fn new(category: TrialCategory, presence: SingletonPresence) -> Self {
        Self { category, presence }
    }

    /// Singleton-absent label for the given category.
    pub const fn absent(category: TrialCategory) -> Self {
        Self::new(category, SingletonPresence::Absent)
    }

    /// Singleton-present label for the given category.
    pub const fn present(category: TrialCategory) -> Self {
        Self::new(category, SingletonPresence::Present)
    }

    /// Returns the same category with a different presence flag.
    pub fn with_presence(self, presence: SingletonPresence) -> Self {
        Self::new(self.category, presence)
    }
}

impl Display for TrialLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category.code())?;
        if self.presence.is_present() {
            f.write_str("_SP")?;
        }
        Ok(())
    }
}

impl FromStr for TrialLabel {
    type Err = TrialgenError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (code, presence) = if let Some(code) = trimmed.strip_suffix("_SP") {
            (code, SingletonPresence::Present)
        } else if let Some(code) = trimmed.strip_suffix("_SA") {
            (code, SingletonPresence::Absent)
        } else {
            (trimmed, SingletonPresence::Absent)
        };
        let category = match code {
            "C" => TrialCategory::Control,
            "NP" => TrialCategory::NegativePriming,
            "PP" => TrialCategory::PositivePriming,
            other => {
                return Err(TrialgenError::Serde(
                    ErrorInfo::new("label-parse", "unknown trial label")
                        .with_context("label", other)
                        .with_hint("expected C, NP or PP with optional _SP/_SA suffix"),
                ))
            }
        };
        Ok(Self::new(category, presence))
    }
}
