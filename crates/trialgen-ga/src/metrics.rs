use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trialgen_core::TrialgenError;

use crate::fitness::FitnessBreakdown;

/// Per-generation fitness sample stored for CSV export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSample {
    /// Generation number (1-based, 0 is the initial population).
    pub generation: usize,
    /// Best normalised fitness in the population.
    pub best_fitness: f64,
    /// Mean normalised fitness in the population.
    pub mean_fitness: f64,
    /// Raw fitness of the best individual.
    pub best_raw: f64,
    /// Adjacency violations of the best individual.
    pub adjacency_violations: usize,
}

/// Collects per-generation samples.
#[derive(Debug, Default)]
pub struct FitnessHistory {
    samples: Vec<GenerationSample>,
}

impl FitnessHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the state of one generation.
    pub fn record(&mut self, generation: usize, best: &FitnessBreakdown, normalized: &[f64]) {
        let mean_fitness = if normalized.is_empty() {
            0.0
        } else {
            normalized.iter().sum::<f64>() / normalized.len() as f64
        };
        self.samples.push(GenerationSample {
            generation,
            best_fitness: best.normalized,
            mean_fitness,
            best_raw: best.raw,
            adjacency_violations: best.adjacency_violations,
        });
    }

    /// Returns the recorded samples.
    pub fn samples(&self) -> &[GenerationSample] {
        &self.samples
    }

    /// Consumes the recorder and returns its samples.
    pub fn into_samples(self) -> Vec<GenerationSample> {
        self.samples
    }
}

/// Writes generation samples as CSV.
pub fn write_history_csv(samples: &[GenerationSample], path: &Path) -> Result<(), TrialgenError> {
    ensure_parent(path)?;
    let mut writer =
        csv::Writer::from_path(path).map_err(|err| TrialgenError::io("history-open", err, path))?;
    for sample in samples {
        writer
            .serialize(sample)
            .map_err(|err| TrialgenError::io("history-write", err, path))?;
    }
    writer
        .flush()
        .map_err(|err| TrialgenError::io("history-flush", err, path))
}

/// Frequency of distances between consecutive event indices.
///
/// Gaps are kept in first-seen order; [`GapHistogram::ranked`] sorts them by
/// frequency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapHistogram {
    counts: IndexMap<usize, usize>,
}

#[derive(Serialize)]
struct GapRow {
    gap: usize,
    count: usize,
}

impl GapHistogram {
    /// Builds the histogram from ascending event indices.
    pub fn from_indices(indices: &[usize]) -> Self {
        let mut counts = IndexMap::new();
        for pair in indices.windows(2) {
            *counts.entry(pair[1] - pair[0]).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Number of recorded gaps.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Whether no gaps were recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Gaps and counts in first-seen order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(gap, count)| (*gap, *count))
    }

    /// Gaps sorted by descending count, ties broken by ascending gap.
    pub fn ranked(&self) -> Vec<(usize, usize)> {
        let mut ranked: Vec<(usize, usize)> = self.entries().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// `true` unless one gap dominates: the most frequent gap must occur
    /// less often than the second and third most frequent combined.
    /// Histograms without gaps pass.
    pub fn is_irregular(&self) -> bool {
        if self.counts.is_empty() {
            return true;
        }
        let ranked = self.ranked();
        let count_at = |rank: usize| ranked.get(rank).map(|(_, count)| *count).unwrap_or(0);
        count_at(0) < count_at(1) + count_at(2)
    }

    /// Writes `gap,count` rows in ascending gap order.
    pub fn write_csv(&self, path: &Path) -> Result<(), TrialgenError> {
        ensure_parent(path)?;
        let mut rows: Vec<GapRow> = self
            .entries()
            .map(|(gap, count)| GapRow { gap, count })
            .collect();
        rows.sort_by_key(|row| row.gap);
        let mut writer =
            csv::Writer::from_path(path).map_err(|err| TrialgenError::io("gaps-open", err, path))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|err| TrialgenError::io("gaps-write", err, path))?;
        }
        writer
            .flush()
            .map_err(|err| TrialgenError::io("gaps-flush", err, path))
    }
}

fn ensure_parent(path: &Path) -> Result<(), TrialgenError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| TrialgenError::io("mkdir", err, parent))?;
        }
    }
    Ok(())
}
