use trialgen_core::{CandidateCondition, Placement};

/// Target and singleton of the previously instantiated trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceState {
    /// Previous target, `None` before the first trial.
    pub prev_target: Option<Placement>,
    /// Previous singleton, `None` when that trial had no singleton.
    pub prev_singleton: Option<Placement>,
}

impl SequenceState {
    /// Records the chosen condition. An absent singleton clears the slot, so
    /// two absent trials in a row never leave a stale singleton behind.
    pub fn advance(&mut self, condition: &CandidateCondition) {
        self.prev_target = Some(condition.target);
        self.prev_singleton = condition.singleton;
    }

    /// True before the first trial of a block.
    pub fn is_empty(&self) -> bool {
        self.prev_target.is_none() && self.prev_singleton.is_none()
    }

    /// Compact rendering for error context.
    pub fn describe(&self) -> String {
        let render = |placement: Option<Placement>| match placement {
            Some(p) => format!("{}@{}", p.digit, p.location),
            None => "none".to_string(),
        };
        format!(
            "target={} singleton={}",
            render(self.prev_target),
            render(self.prev_singleton)
        )
    }
}
