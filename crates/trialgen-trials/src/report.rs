use serde::{Deserialize, Serialize};
use tracing::info;
use trialgen_core::{TrialCategory, TrialRecord};

/// Summary counts of an instantiated block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceTraits {
    /// Trials in the block.
    pub total: usize,
    /// Trials with a singleton.
    pub singleton_present: usize,
    /// Control trials.
    pub control: usize,
    /// Negative priming trials.
    pub negative_priming: usize,
    /// Positive priming trials.
    pub positive_priming: usize,
    /// Singleton placed where the previous target was.
    pub attended_repetitions: usize,
    /// Singleton placed where the previous singleton was.
    pub ignored_repetitions: usize,
}

impl SequenceTraits {
    /// Counts traits over records in sequence order.
    pub fn from_records(records: &[TrialRecord]) -> Self {
        let mut traits = SequenceTraits {
            total: records.len(),
            ..Self::default()
        };
        for (position, record) in records.iter().enumerate() {
            match record.label.category {
                TrialCategory::Control => traits.control += 1,
                TrialCategory::NegativePriming => traits.negative_priming += 1,
                TrialCategory::PositivePriming => traits.positive_priming += 1,
            }
            let Some(singleton) = record.condition.singleton else {
                continue;
            };
            traits.singleton_present += 1;
            if position == 0 {
                continue;
            }
            let previous = &records[position - 1].condition;
            if singleton == previous.target {
                traits.attended_repetitions += 1;
            }
            if Some(singleton) == previous.singleton {
                traits.ignored_repetitions += 1;
            }
        }
        traits
    }

    /// Emits the counts at info level.
    pub fn log(&self, subject_id: u32, block: u32) {
        info!(
            subject_id,
            block,
            total = self.total,
            singleton_present = self.singleton_present,
            control = self.control,
            negative_priming = self.negative_priming,
            positive_priming = self.positive_priming,
            attended_repetitions = self.attended_repetitions,
            ignored_repetitions = self.ignored_repetitions,
            "sequence traits"
        );
    }

    /// Plain-text rendering appended to the subject's sequence log.
    pub fn to_text(&self, subject_id: u32, block: u32) -> String {
        format!(
            "subject {subject_id} block {block}\n\
             trials: {}\n\
             singleton present: {}\n\
             C: {}  NP: {}  PP: {}\n\
             attended repetitions: {}\n\
             ignored repetitions: {}\n",
            self.total,
            self.singleton_present,
            self.control,
            self.negative_priming,
            self.positive_priming,
            self.attended_repetitions,
            self.ignored_repetitions,
        )
    }
}
