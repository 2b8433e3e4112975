use serde::{Deserialize, Serialize};
use trialgen_core::TrialLabel;

/// Index into [`ConstraintSet::alphabet`].
pub type Gene = u8;

/// Candidate solution: one gene per trial.
pub type Genome = Vec<Gene>;

/// Local rule over neighbouring genes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AdjacencyRule {
    /// No two consecutive genes may both belong to `restricted`.
    NoConsecutive {
        /// Restricted genes.
        restricted: Vec<Gene>,
    },
    /// Runs of `gene` may not exceed `max_run`.
    MaxRun {
        /// Capped gene.
        gene: Gene,
        /// Longest allowed run.
        max_run: usize,
    },
}

impl AdjacencyRule {
    /// Counts violations of the rule in `genome`.
    ///
    /// `NoConsecutive` charges every offending pair. `MaxRun` charges every
    /// trial that extends a run past the cap, so a run of `max_run + 3`
    /// costs three violations.
    pub fn violations(&self, genome: &[Gene]) -> usize {
        match self {
            AdjacencyRule::NoConsecutive { restricted } => genome
                .windows(2)
                .filter(|pair| restricted.contains(&pair[0]) && restricted.contains(&pair[1]))
                .count(),
            AdjacencyRule::MaxRun { gene, max_run } => {
                let mut run = 0usize;
                let mut violations = 0usize;
                for value in genome {
                    if value == gene {
                        run += 1;
                        if run > *max_run {
                            violations += 1;
                        }
                    } else {
                        run = 0;
                    }
                }
                violations
            }
        }
    }

    /// Whether `position` is charged a violation: the second gene of a
    /// restricted pair, or a gene extending a run past its cap.
    pub fn breaks_at(&self, genome: &[Gene], position: usize) -> bool {
        match self {
            AdjacencyRule::NoConsecutive { restricted } => {
                position > 0
                    && restricted.contains(&genome[position])
                    && restricted.contains(&genome[position - 1])
            }
            AdjacencyRule::MaxRun { gene, max_run } => {
                genome[position] == *gene
                    && genome[..=position]
                        .iter()
                        .rev()
                        .take_while(|value| *value == gene)
                        .count()
                        > *max_run
            }
        }
    }

    /// Whether the gene at `position` takes part in any violation.
    pub fn involves(&self, genome: &[Gene], position: usize) -> bool {
        match self {
            AdjacencyRule::NoConsecutive { restricted } => {
                let value = genome[position];
                restricted.contains(&value)
                    && ((position > 0 && restricted.contains(&genome[position - 1]))
                        || genome
                            .get(position + 1)
                            .is_some_and(|next| restricted.contains(next)))
            }
            AdjacencyRule::MaxRun { gene, max_run } => {
                if genome[position] != *gene {
                    return false;
                }
                let before = genome[..position]
                    .iter()
                    .rev()
                    .take_while(|value| *value == gene)
                    .count();
                let after = genome[position + 1..]
                    .iter()
                    .take_while(|value| *value == gene)
                    .count();
                before + 1 + after > *max_run
            }
        }
    }

    /// Largest violation count the rule can produce for `num_trials` genes.
    pub fn worst_case(&self, num_trials: usize) -> usize {
        match self {
            AdjacencyRule::NoConsecutive { restricted } if restricted.is_empty() => 0,
            AdjacencyRule::NoConsecutive { .. } => num_trials.saturating_sub(1),
            AdjacencyRule::MaxRun { max_run, .. } => num_trials.saturating_sub(*max_run),
        }
    }
}

/// Compiled scoring target for one optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Label emitted for each gene value.
    pub alphabet: Vec<TrialLabel>,
    /// Desired occurrences per gene (may be fractional).
    pub desired_counts: Vec<f64>,
    /// Adjacency rules.
    pub rules: Vec<AdjacencyRule>,
    /// Gene required at position 0, if any.
    pub anchor: Option<Gene>,
    /// Penalty per adjacency or anchor violation.
    pub weight: f64,
}

impl ConstraintSet {
    /// Number of distinct gene values.
    pub fn alphabet_len(&self) -> usize {
        self.alphabet.len()
    }

    /// Gene encoding `label`, if the label is part of the alphabet.
    pub fn gene_of(&self, label: TrialLabel) -> Option<Gene> {
        self.alphabet
            .iter()
            .position(|candidate| *candidate == label)
            .map(|index| index as Gene)
    }

    /// Decodes a genome into labels.
    pub fn decode(&self, genome: &[Gene]) -> Vec<TrialLabel> {
        genome
            .iter()
            .map(|gene| self.alphabet[*gene as usize])
            .collect()
    }

    /// Occurrences of every gene value.
    pub fn counts(&self, genome: &[Gene]) -> Vec<usize> {
        let mut counts = vec![0usize; self.alphabet.len()];
        for gene in genome {
            counts[*gene as usize] += 1;
        }
        counts
    }

    /// Whether the gene at `position` is clear of every adjacency rule.
    pub fn fits_at(&self, genome: &[Gene], position: usize) -> bool {
        !self.rules.iter().any(|rule| rule.involves(genome, position))
    }

    /// Total adjacency violations across all rules.
    pub fn adjacency_violations(&self, genome: &[Gene]) -> usize {
        self.rules.iter().map(|rule| rule.violations(genome)).sum()
    }
}
