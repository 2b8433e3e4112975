use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintSet, Gene};

/// Breakdown of the penalty terms behind one fitness value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    /// Sum of `|desired - actual|` over categories.
    pub proportion_penalty: f64,
    /// Largest single-category deviation from its desired count.
    pub max_count_deviation: f64,
    /// Adjacency rule violations.
    pub adjacency_violations: usize,
    /// Whether position 0 misses the anchor category.
    pub anchor_violated: bool,
    /// Raw fitness (penalties subtracted from zero).
    pub raw: f64,
    /// Raw fitness mapped into `[0, 1]`.
    pub normalized: f64,
}

impl FitnessBreakdown {
    /// Whether any hard-weighted rule is still broken.
    pub fn has_rule_violations(&self) -> bool {
        self.adjacency_violations > 0 || self.anchor_violated
    }
}

/// Statically computed normalisation bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessBounds {
    /// Ideal fitness (zero penalties).
    pub max: f64,
    /// Theoretical worst case.
    pub min: f64,
}

impl FitnessBounds {
    /// Derives the bounds from the constraint set and sequence length.
    ///
    /// The proportion term is worst when every trial lands in the category
    /// with the smallest target, giving `2 * (N - min_desired)`.
    pub fn for_constraints(constraints: &ConstraintSet, num_trials: usize) -> Self {
        let n = num_trials as f64;
        let min_desired = constraints
            .desired_counts
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let min_desired = if min_desired.is_finite() { min_desired } else { 0.0 };
        let proportion_worst = 2.0 * (n - min_desired).max(0.0);
        let adjacency_worst: usize = constraints
            .rules
            .iter()
            .map(|rule| rule.worst_case(num_trials))
            .sum();
        let anchor_worst = usize::from(constraints.anchor.is_some());
        let rule_worst = constraints.weight * (adjacency_worst + anchor_worst) as f64;
        Self {
            max: 0.0,
            min: -(proportion_worst + rule_worst),
        }
    }

    /// Maps a raw fitness into `[0, 1]`; degenerate bounds map to `0.0`.
    pub fn normalize(&self, raw: f64) -> f64 {
        if self.max == self.min {
            return 0.0;
        }
        (raw - self.min) / (self.max - self.min)
    }
}

/// Scores one genome.
pub fn evaluate(genome: &[Gene], constraints: &ConstraintSet, bounds: &FitnessBounds) -> FitnessBreakdown {
    let counts = constraints.counts(genome);
    let mut proportion_penalty = 0.0;
    let mut max_count_deviation = 0.0f64;
    for (desired, actual) in constraints.desired_counts.iter().zip(counts.iter()) {
        let deviation = (desired - *actual as f64).abs();
        proportion_penalty += deviation;
        max_count_deviation = max_count_deviation.max(deviation);
    }
    let adjacency_violations = constraints.adjacency_violations(genome);
    let anchor_violated = constraints
        .anchor
        .map(|anchor| genome.first() != Some(&anchor))
        .unwrap_or(false);
    let rule_penalty =
        constraints.weight * (adjacency_violations + usize::from(anchor_violated)) as f64;
    let raw = -(proportion_penalty + rule_penalty);
    FitnessBreakdown {
        proportion_penalty,
        max_count_deviation,
        adjacency_violations,
        anchor_violated,
        raw,
        normalized: bounds.normalize(raw),
    }
}
