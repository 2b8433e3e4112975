#![deny(missing_docs)]
#![doc = "Core value types, structured errors and deterministic seeding shared by the trialgen crates."]

pub mod errors;
pub mod hash;
pub mod label;
pub mod rng;
pub mod trial;

pub use errors::{ErrorInfo, TrialgenError};
pub use hash::{stable_hash_string, to_canonical_json_bytes};
pub use label::{SingletonPresence, TrialCategory, TrialLabel};
pub use rng::{block_seed, derive_substream_seed, RngHandle};
pub use trial::{CandidateCondition, CueInstruction, DistractorProb, Placement, TrialRecord};

/// Renders a label sequence as a comma separated string for logs.
pub fn format_labels(labels: &[TrialLabel]) -> String {
    labels
        .iter()
        .map(|label| label.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
