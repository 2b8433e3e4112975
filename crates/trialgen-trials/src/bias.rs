use rand::Rng;
use trialgen_core::{CandidateCondition, DistractorProb};

use crate::config::BiasConfig;

/// Distractor-location bias resolved for one subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistractorBias {
    /// Probability of drawing the singleton at `biased_location`.
    pub hp: f64,
    /// Loudspeaker favoured for this subject.
    pub biased_location: u8,
}

impl DistractorBias {
    /// Even subject ids use `even_subject_location`, odd ids the other one.
    pub fn for_subject(config: &BiasConfig, subject_id: u32) -> Self {
        let biased_location = if subject_id % 2 == 0 {
            config.even_subject_location
        } else {
            config.odd_subject_location
        };
        Self {
            hp: config.hp_distractor,
            biased_location,
        }
    }

    /// Narrows a singleton-present candidate list. One Bernoulli draw picks
    /// the biased or the complementary subset; a subset that would be empty
    /// is skipped and the list is returned unchanged.
    pub fn restrict<'a, R: Rng + ?Sized>(
        &self,
        candidates: Vec<&'a CandidateCondition>,
        rng: &mut R,
    ) -> Vec<&'a CandidateCondition> {
        let want_biased = rng.gen_bool(self.hp.clamp(0.0, 1.0));
        let narrowed: Vec<&CandidateCondition> = candidates
            .iter()
            .copied()
            .filter(|row| {
                row.singleton
                    .map(|s| (s.location == self.biased_location) == want_biased)
                    .unwrap_or(false)
            })
            .collect();
        if narrowed.is_empty() {
            candidates
        } else {
            narrowed
        }
    }

    /// Tag derived from the sampled singleton's actual location.
    pub fn tag(&self, condition: &CandidateCondition) -> DistractorProb {
        match condition.singleton {
            None => DistractorProb::DistractorAbsent,
            Some(s) if s.location == self.biased_location => DistractorProb::HighProbability,
            Some(_) => DistractorProb::LowProbability,
        }
    }
}
