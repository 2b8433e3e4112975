//! Timing jitter balanced across singleton-present and -absent trials.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trialgen_core::{SingletonPresence, TrialgenError};

use crate::config::JitterConfig;

/// Knobs of one balanced draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterParams {
    /// Relative half-width of the uniform window around the base.
    pub spread: f64,
    /// Largest accepted difference between the two group means.
    pub tolerance: f64,
    /// Redraws before giving up on the tolerance.
    pub max_attempts: usize,
}

impl JitterParams {
    /// Rejects windows that would reach zero or negative durations.
    pub fn validate(&self) -> Result<(), TrialgenError> {
        if !(0.0..1.0).contains(&self.spread) {
            return Err(TrialgenError::config(
                "jitter-spread",
                "spread must lie in [0, 1)",
                "spread",
                self.spread,
            ));
        }
        if self.tolerance <= 0.0 || !self.tolerance.is_finite() {
            return Err(TrialgenError::config(
                "jitter-tolerance",
                "tolerance must be positive",
                "tolerance",
                self.tolerance,
            ));
        }
        if self.max_attempts == 0 {
            return Err(TrialgenError::config(
                "jitter-attempts",
                "max_attempts must be positive",
                "max_attempts",
                self.max_attempts,
            ));
        }
        Ok(())
    }
}

impl JitterConfig {
    /// Draw parameters shared by every jittered duration.
    pub fn params(&self) -> JitterParams {
        JitterParams {
            spread: self.spread,
            tolerance: self.tolerance,
            max_attempts: self.max_attempts,
        }
    }
}

/// Result of [`balanced_jitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct JitterOutcome {
    /// One value per trial, rounded to milliseconds.
    pub values: Vec<f64>,
    /// Absolute difference between the group means.
    pub mean_difference: f64,
    /// Draws used.
    pub attempts: usize,
    /// Whether `mean_difference` is within tolerance.
    pub balanced: bool,
}

/// Rounds to three decimals, the resolution written to sequence files.
pub fn round_ms(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Absolute difference of the group means; `0.0` when either group is empty.
pub fn group_mean_difference(presence: &[SingletonPresence], values: &[f64]) -> f64 {
    let (mut present_sum, mut present_n, mut absent_sum, mut absent_n) = (0.0, 0usize, 0.0, 0usize);
    for (flag, value) in presence.iter().zip(values) {
        if flag.is_present() {
            present_sum += value;
            present_n += 1;
        } else {
            absent_sum += value;
            absent_n += 1;
        }
    }
    if present_n == 0 || absent_n == 0 {
        return 0.0;
    }
    (present_sum / present_n as f64 - absent_sum / absent_n as f64).abs()
}

/// Draws one jitter value per trial from `U(base(1-spread), base(1+spread))`
/// and redraws until the present and absent group means agree within the
/// tolerance. Falls back to the closest draw after `max_attempts`.
pub fn balanced_jitter<R: Rng + ?Sized>(
    presence: &[SingletonPresence],
    base: f64,
    params: &JitterParams,
    rng: &mut R,
) -> JitterOutcome {
    let low = base * (1.0 - params.spread);
    let high = base * (1.0 + params.spread);
    let mut best: Option<(Vec<f64>, f64)> = None;

    for attempt in 1..=params.max_attempts.max(1) {
        let values: Vec<f64> = presence
            .iter()
            .map(|_| {
                if high > low {
                    round_ms(rng.gen_range(low..=high))
                } else {
                    round_ms(base)
                }
            })
            .collect();
        let difference = group_mean_difference(presence, &values);
        if difference < params.tolerance {
            debug!(attempt, difference, "jitter balanced");
            return JitterOutcome {
                values,
                mean_difference: difference,
                attempts: attempt,
                balanced: true,
            };
        }
        if best.as_ref().map_or(true, |(_, current)| difference < *current) {
            best = Some((values, difference));
        }
    }

    let (values, difference) = best.unwrap_or_default();
    warn!(
        attempts = params.max_attempts,
        difference,
        tolerance = params.tolerance,
        "jitter groups not balanced, keeping closest draw"
    );
    JitterOutcome {
        values,
        mean_difference: difference,
        attempts: params.max_attempts,
        balanced: false,
    }
}
