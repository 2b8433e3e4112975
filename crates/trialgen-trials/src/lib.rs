#![deny(missing_docs)]

//! Turns optimised label sequences into concrete trials.
//!
//! The instantiator walks a label sequence once, sampling a condition from
//! the enumerated pool at each position so that priming labels relate to the
//! previous trial as required. Jitter, cues and the per-subject block layout
//! are layered on top.

/// Distractor-location bias per subject.
pub mod bias;
/// Experiment configuration loaded from YAML.
pub mod config;
/// Cue assignment strategies.
pub mod cues;
/// Per-position sampling state machine.
pub mod instantiate;
/// Balanced timing jitter.
pub mod jitter;
/// Sequence file reading and writing.
pub mod output;
/// Block generation and subject directories.
pub mod pipeline;
/// Condition pool enumeration and CSV I/O.
pub mod pool;
/// Sequence trait counts.
pub mod report;
/// Previous-trial state.
pub mod state;
/// Post-hoc sequence checks.
pub mod verify;

pub use bias::DistractorBias;
pub use config::{BiasConfig, ControlExclusion, CueConfig, ExperimentConfig, JitterConfig, SessionConfig};
pub use cues::{assign_cues, CueAssignment, CueStrategy};
pub use instantiate::{instantiate, Correction, CorrectionKind, InstantiateOptions, Instantiation};
pub use jitter::{balanced_jitter, JitterOutcome, JitterParams};
pub use output::{read_sequence_csv, write_sequence_csv};
pub use pipeline::{generate_block, run_subject, write_block, BlockOutcome, SubjectLayout};
pub use pool::ConditionPool;
pub use report::SequenceTraits;
pub use state::SequenceState;
pub use verify::{verify_sequence, CheckResult, VerificationReport, VerifyOptions};
