#![deny(missing_docs)]

//! Genetic search over trial-category label sequences.
//!
//! A candidate is a fixed-length vector of genes indexing a small label
//! alphabet. Candidates are scored by subtracting proportion and adjacency
//! penalties from zero and normalising against a precomputed worst case.
//! The best candidate is returned even when constraints remain violated.

/// YAML configuration schema and defaults.
pub mod config;
/// Compiled constraint sets and adjacency rules.
pub mod constraints;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Penalty-based fitness and normalisation bounds.
pub mod fitness;
/// Generational search loop and public `optimize` entry point.
pub mod kernel;
/// Run manifest serialization helpers.
pub mod manifest;
/// Fitness history and gap histograms.
pub mod metrics;
/// Parent selection.
pub mod selection;
/// Singleton-presence post-pass.
pub mod singleton;
/// Crossover and mutation operators.
pub mod variation;

pub use config::{GaConfig, RunCap, SeedPolicy, SequenceDesign};
pub use constraints::{AdjacencyRule, ConstraintSet, Gene, Genome};
pub use fitness::{evaluate, FitnessBounds, FitnessBreakdown};
pub use kernel::{count_labels, optimize, OptimizeSummary};
pub use manifest::RunManifest;
pub use metrics::{write_history_csv, FitnessHistory, GapHistogram, GenerationSample};
pub use singleton::{insert_singleton_present, SingletonInsertion, SingletonOutcome};
