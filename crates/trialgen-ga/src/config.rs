use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trialgen_core::errors::ErrorInfo;
use trialgen_core::{TrialCategory, TrialLabel, TrialgenError};

use crate::constraints::{AdjacencyRule, ConstraintSet};

const PROPORTION_TOLERANCE: f64 = 1e-6;

/// YAML-configurable parameters governing one optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaConfig {
    /// Length of the label sequence.
    #[serde(default = "default_num_trials")]
    pub num_trials: usize,
    /// Category alphabet and proportion targets.
    #[serde(default)]
    pub design: SequenceDesign,
    /// Extra run-length caps applied on top of the design's own rules.
    #[serde(default)]
    pub run_caps: Vec<RunCap>,
    /// Penalty charged per adjacency or anchor violation.
    #[serde(default = "default_rule_violation_factor")]
    pub rule_violation_factor: f64,
    /// Upper bound on the number of generations.
    #[serde(default = "default_num_generations")]
    pub num_generations: usize,
    /// Parents drawn per generation.
    #[serde(default = "default_num_parents_mating")]
    pub num_parents_mating: usize,
    /// Population size.
    #[serde(default = "default_sol_per_pop")]
    pub sol_per_pop: usize,
    /// Individuals carried over unchanged (elitism).
    #[serde(default = "default_keep_parents")]
    pub keep_parents: usize,
    /// Percentage of genes mutated per offspring.
    #[serde(default = "default_mutation_percent_genes")]
    pub mutation_percent_genes: f64,
    /// Normalised fitness at which the search stops early.
    ///
    /// The normalisation range includes `rule_violation_factor * (N - 1)`,
    /// so near 1.0 the threshold still admits a proportion penalty of about
    /// `(1 - threshold) * factor * N` trials (roughly 22 at N = 225 with the
    /// defaults). Raise it, or set it above 1.0 to disable early stopping,
    /// when exact category counts matter more than run time.
    #[serde(default = "default_fitness_threshold")]
    pub fitness_threshold: f64,
    /// Swap genes that break adjacency rules into legal positions after
    /// mutation.
    #[serde(default = "default_repair_adjacency")]
    pub repair_adjacency: bool,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

fn default_num_trials() -> usize {
    225
}

fn default_rule_violation_factor() -> f64 {
    1000.0
}

fn default_num_generations() -> usize {
    3000
}

fn default_num_parents_mating() -> usize {
    10
}

fn default_sol_per_pop() -> usize {
    200
}

fn default_keep_parents() -> usize {
    2
}

fn default_mutation_percent_genes() -> f64 {
    5.0
}

fn default_fitness_threshold() -> f64 {
    0.9999
}

fn default_repair_adjacency() -> bool {
    true
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            num_trials: default_num_trials(),
            design: SequenceDesign::default(),
            run_caps: Vec::new(),
            rule_violation_factor: default_rule_violation_factor(),
            num_generations: default_num_generations(),
            num_parents_mating: default_num_parents_mating(),
            sol_per_pop: default_sol_per_pop(),
            keep_parents: default_keep_parents(),
            mutation_percent_genes: default_mutation_percent_genes(),
            fitness_threshold: default_fitness_threshold(),
            repair_adjacency: default_repair_adjacency(),
            seed_policy: SeedPolicy::default(),
        }
    }
}

/// Category alphabets supported by the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SequenceDesign {
    /// Control / negative priming / positive priming with no two priming
    /// trials in a row.
    Priming {
        /// Target share of Control trials.
        #[serde(default = "default_prop_c")]
        prop_c: f64,
        /// Target share of negative priming trials.
        #[serde(default = "default_prop_priming")]
        prop_np: f64,
        /// Target share of positive priming trials.
        #[serde(default = "default_prop_priming")]
        prop_pp: f64,
        /// Penalise sequences that do not open with a Control trial.
        #[serde(default = "default_anchor_control")]
        anchor_control: bool,
    },
    /// Singleton present / absent Control trials with a cap on present runs.
    SingletonPresence {
        /// Target share of singleton-present trials.
        #[serde(default = "default_prop_sp")]
        prop_sp: f64,
        /// Longest allowed run of singleton-present trials.
        #[serde(default = "default_max_consecutive_sp")]
        max_consecutive_sp: usize,
    },
}

fn default_prop_c() -> f64 {
    0.6
}

fn default_prop_priming() -> f64 {
    0.2
}

fn default_anchor_control() -> bool {
    true
}

fn default_prop_sp() -> f64 {
    0.7
}

fn default_max_consecutive_sp() -> usize {
    5
}

impl Default for SequenceDesign {
    fn default() -> Self {
        SequenceDesign::Priming {
            prop_c: default_prop_c(),
            prop_np: default_prop_priming(),
            prop_pp: default_prop_priming(),
            anchor_control: default_anchor_control(),
        }
    }
}

impl SequenceDesign {
    /// Whether labels still need a singleton-presence pass after optimisation.
    pub fn needs_singleton_pass(&self) -> bool {
        matches!(self, SequenceDesign::Priming { .. })
    }
}

/// Additional cap on consecutive trials carrying one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCap {
    /// Label as written in sequence files (`C`, `NP`, `C_SP`, ...).
    pub label: String,
    /// Longest allowed run.
    pub max_run: usize,
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

impl GaConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, TrialgenError> {
        let config: GaConfig = serde_yaml::from_str(contents).map_err(|err| {
            TrialgenError::Config(ErrorInfo::new("ga-config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, TrialgenError> {
        let contents =
            fs::read_to_string(path).map_err(|err| TrialgenError::io("ga-config-read", err, path))?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            TrialgenError::Config(info) => {
                TrialgenError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Rejects knob combinations the search cannot run with.
    pub fn validate(&self) -> Result<(), TrialgenError> {
        if self.num_trials == 0 {
            return Err(TrialgenError::config(
                "ga-num-trials",
                "num_trials must be positive",
                "num_trials",
                self.num_trials,
            ));
        }
        if self.sol_per_pop < 2 {
            return Err(TrialgenError::config(
                "ga-population",
                "sol_per_pop must be at least 2",
                "sol_per_pop",
                self.sol_per_pop,
            ));
        }
        if self.keep_parents >= self.sol_per_pop {
            return Err(TrialgenError::Config(
                ErrorInfo::new("ga-keep-parents", "keep_parents must be below sol_per_pop")
                    .with_context("keep_parents", self.keep_parents.to_string())
                    .with_context("sol_per_pop", self.sol_per_pop.to_string()),
            ));
        }
        if self.num_parents_mating == 0 || self.num_parents_mating > self.sol_per_pop {
            return Err(TrialgenError::config(
                "ga-parents",
                "num_parents_mating must lie in 1..=sol_per_pop",
                "num_parents_mating",
                self.num_parents_mating,
            ));
        }
        if !(0.0..=100.0).contains(&self.mutation_percent_genes) {
            return Err(TrialgenError::config(
                "ga-mutation",
                "mutation_percent_genes must lie in [0, 100]",
                "mutation_percent_genes",
                self.mutation_percent_genes,
            ));
        }
        if self.rule_violation_factor < 0.0 {
            return Err(TrialgenError::config(
                "ga-violation-factor",
                "rule_violation_factor must be non-negative",
                "rule_violation_factor",
                self.rule_violation_factor,
            ));
        }
        match &self.design {
            SequenceDesign::Priming {
                prop_c,
                prop_np,
                prop_pp,
                ..
            } => check_proportions(&[("prop_c", *prop_c), ("prop_np", *prop_np), ("prop_pp", *prop_pp)])?,
            SequenceDesign::SingletonPresence {
                prop_sp,
                max_consecutive_sp,
            } => {
                check_proportions(&[("prop_sp", *prop_sp), ("prop_sa", 1.0 - *prop_sp)])?;
                if *max_consecutive_sp == 0 {
                    return Err(TrialgenError::config(
                        "ga-max-run",
                        "max_consecutive_sp must be positive",
                        "max_consecutive_sp",
                        max_consecutive_sp,
                    ));
                }
            }
        }
        self.constraints().map(|_| ())
    }

    /// Compiles the design into the constraint set scored by the fitness function.
    pub fn constraints(&self) -> Result<ConstraintSet, TrialgenError> {
        let n = self.num_trials as f64;
        let mut set = match &self.design {
            SequenceDesign::Priming {
                prop_c,
                prop_np,
                prop_pp,
                anchor_control,
            } => ConstraintSet {
                alphabet: vec![
                    TrialLabel::absent(TrialCategory::Control),
                    TrialLabel::absent(TrialCategory::NegativePriming),
                    TrialLabel::absent(TrialCategory::PositivePriming),
                ],
                desired_counts: vec![prop_c * n, prop_np * n, prop_pp * n],
                rules: vec![AdjacencyRule::NoConsecutive {
                    restricted: vec![1, 2],
                }],
                anchor: anchor_control.then_some(0),
                weight: self.rule_violation_factor,
            },
            SequenceDesign::SingletonPresence {
                prop_sp,
                max_consecutive_sp,
            } => ConstraintSet {
                alphabet: vec![
                    TrialLabel::absent(TrialCategory::Control),
                    TrialLabel::present(TrialCategory::Control),
                ],
                desired_counts: vec![(1.0 - prop_sp) * n, prop_sp * n],
                rules: vec![AdjacencyRule::MaxRun {
                    gene: 1,
                    max_run: *max_consecutive_sp,
                }],
                anchor: None,
                weight: self.rule_violation_factor,
            },
        };
        for cap in &self.run_caps {
            let label: TrialLabel = cap.label.parse().map_err(|_| {
                TrialgenError::config("ga-run-cap", "unknown label in run_caps", "label", &cap.label)
            })?;
            let gene = set.gene_of(label).ok_or_else(|| {
                TrialgenError::Config(
                    ErrorInfo::new("ga-run-cap", "run cap label is not part of the design")
                        .with_context("label", cap.label.clone()),
                )
            })?;
            if cap.max_run == 0 {
                return Err(TrialgenError::config(
                    "ga-run-cap",
                    "max_run must be positive",
                    "label",
                    &cap.label,
                ));
            }
            set.rules.push(AdjacencyRule::MaxRun {
                gene,
                max_run: cap.max_run,
            });
        }
        Ok(set)
    }

    /// Number of genes mutated per offspring.
    pub fn genes_to_mutate(&self) -> usize {
        let raw = (self.mutation_percent_genes / 100.0 * self.num_trials as f64).round() as usize;
        raw.clamp(1, self.num_trials)
    }
}

fn check_proportions(props: &[(&str, f64)]) -> Result<(), TrialgenError> {
    for (name, value) in props {
        if !(0.0..=1.0).contains(value) {
            return Err(TrialgenError::config(
                "ga-proportion",
                "proportions must lie in [0, 1]",
                name,
                value,
            ));
        }
    }
    let total: f64 = props.iter().map(|(_, value)| value).sum();
    if (total - 1.0).abs() > PROPORTION_TOLERANCE {
        return Err(TrialgenError::Config(
            ErrorInfo::new("ga-proportion-sum", "category proportions must sum to one")
                .with_context("sum", total.to_string()),
        ));
    }
    Ok(())
}
