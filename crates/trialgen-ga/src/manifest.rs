use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trialgen_core::errors::ErrorInfo;
use trialgen_core::{stable_hash_string, TrialgenError};

use crate::config::GaConfig;
use crate::fitness::FitnessBreakdown;
use crate::kernel::OptimizeSummary;

/// Manifest layout version written by this crate.
pub const MANIFEST_SCHEMA: u32 = 1;

/// Ties a manifest to the configuration and label sequence it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Manifest layout version.
    pub schema: u32,
    /// Canonical hash of the optimizer configuration.
    pub config_hash: String,
    /// Canonical hash of the returned label sequence.
    pub labels_hash: String,
    /// Seed the optimizer ran with.
    pub seed: u64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Crate name to version.
    pub tool_versions: BTreeMap<String, String>,
}

/// Structured manifest describing a completed optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: GaConfig,
    /// Master seed the run was derived from.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Hashes, timestamp and tool versions.
    pub provenance: Provenance,
    /// Generations evaluated.
    pub generations_completed: usize,
    /// Whether the fitness threshold ended the search.
    pub stopped_early: bool,
    /// Fitness of the returned sequence.
    pub fitness: FitnessBreakdown,
    /// Label occurrences in the returned sequence.
    pub label_counts: BTreeMap<String, usize>,
    /// Fitness history file, relative to the manifest.
    pub history_file: Option<PathBuf>,
}

impl RunManifest {
    /// Builds a manifest for `summary`, stamping the current time.
    pub fn from_summary(
        config: &GaConfig,
        seed: u64,
        summary: &OptimizeSummary,
        history_file: Option<PathBuf>,
    ) -> Result<Self, TrialgenError> {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        let provenance = Provenance {
            schema: MANIFEST_SCHEMA,
            config_hash: stable_hash_string(config)?,
            labels_hash: stable_hash_string(&summary.labels)?,
            seed,
            created_at: chrono::Utc::now().to_rfc3339(),
            tool_versions,
        };
        Ok(Self {
            config: config.clone(),
            master_seed: seed,
            seed_label: config.seed_policy.label.clone(),
            provenance,
            generations_completed: summary.generations_completed,
            stopped_early: summary.stopped_early,
            fitness: summary.fitness.clone(),
            label_counts: summary.label_counts.clone(),
            history_file,
        })
    }

    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), TrialgenError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                TrialgenError::Serde(
                    ErrorInfo::new("manifest-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            TrialgenError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            TrialgenError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, TrialgenError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            TrialgenError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let manifest: Self = serde_json::from_str(&contents).map_err(|err| {
            TrialgenError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        if manifest.provenance.schema > MANIFEST_SCHEMA {
            return Err(TrialgenError::Serde(
                ErrorInfo::new("manifest-schema", "manifest was written by a newer trialgen")
                    .with_context("path", path.display().to_string())
                    .with_context("schema", manifest.provenance.schema.to_string()),
            ));
        }
        Ok(manifest)
    }
}
