use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trialgen_core::errors::ErrorInfo;
use trialgen_core::TrialgenError;
use trialgen_ga::{GaConfig, SeedPolicy, SingletonInsertion};

/// Full configuration for generating one subject's blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Session shape.
    #[serde(default)]
    pub session: SessionConfig,
    /// Optimizer knobs; `num_trials` is taken from the session.
    #[serde(default)]
    pub optimizer: GaConfig,
    /// Singleton-presence pass for priming designs.
    #[serde(default)]
    pub singleton: SingletonInsertion,
    /// How Control trials avoid repeating the previous trial.
    #[serde(default)]
    pub control: ControlExclusion,
    /// Distractor-location bias, disabled when absent.
    #[serde(default)]
    pub bias: Option<BiasConfig>,
    /// Spatial cues, disabled when absent.
    #[serde(default)]
    pub cues: Option<CueConfig>,
    /// Timing jitter.
    #[serde(default)]
    pub jitter: JitterConfig,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            optimizer: GaConfig::default(),
            singleton: SingletonInsertion::default(),
            control: ControlExclusion::default(),
            bias: None,
            cues: None,
            jitter: JitterConfig::default(),
            seed_policy: SeedPolicy::default(),
        }
    }
}

/// Number of trials and blocks plus the stimulus layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Trials per block.
    #[serde(default = "default_n_trials")]
    pub n_trials: usize,
    /// Blocks per subject.
    #[serde(default = "default_n_blocks")]
    pub n_blocks: u32,
    /// Loudspeakers, one role per loudspeaker.
    #[serde(default = "default_n_locations")]
    pub n_locations: u8,
    /// Digits available to the roles.
    #[serde(default = "default_n_digits")]
    pub n_digits: u8,
}

fn default_n_trials() -> usize {
    225
}

fn default_n_blocks() -> u32 {
    1
}

fn default_n_locations() -> u8 {
    3
}

fn default_n_digits() -> u8 {
    9
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n_trials: default_n_trials(),
            n_blocks: default_n_blocks(),
            n_locations: default_n_locations(),
            n_digits: default_n_digits(),
        }
    }
}

/// Exclusion applied to Control trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ControlExclusion {
    /// Every target and singleton field must differ from the previous
    /// trial's corresponding field, and no priming or repetition relation
    /// may hold. Relaxed to [`ControlExclusion::Relations`] with a warning
    /// when nothing qualifies, and never combined with a distractor bias
    /// (see [`ExperimentConfig::control_exclusion`]).
    #[default]
    Strict,
    /// Only whole-placement priming and repetition relations are excluded.
    Relations,
}

/// Subject-specific distractor location bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasConfig {
    /// Probability of restricting the singleton to the biased location.
    #[serde(default = "default_hp_distractor")]
    pub hp_distractor: f64,
    /// Biased location for even subject ids.
    #[serde(default = "default_even_location")]
    pub even_subject_location: u8,
    /// Biased location for odd subject ids.
    #[serde(default = "default_odd_location")]
    pub odd_subject_location: u8,
}

fn default_hp_distractor() -> f64 {
    0.7
}

fn default_even_location() -> u8 {
    1
}

fn default_odd_location() -> u8 {
    3
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            hp_distractor: default_hp_distractor(),
            even_subject_location: default_even_location(),
            odd_subject_location: default_odd_location(),
        }
    }
}

/// Cue assignment knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueConfig {
    /// Share of informative cues.
    #[serde(default = "default_prop_informative")]
    pub prop_informative: f64,
    /// Longest run of the informative cue in block-wise designs.
    #[serde(default = "default_max_consecutive")]
    pub max_consecutive_block_cues: usize,
    /// Longest run of any cue type in trial-wise designs.
    #[serde(default = "default_max_consecutive")]
    pub max_consecutive_trial_cues: usize,
    /// Shuffles tried before keeping the last one.
    #[serde(default = "default_max_shuffle_attempts")]
    pub max_shuffle_attempts: usize,
}

fn default_prop_informative() -> f64 {
    0.8
}

fn default_max_consecutive() -> usize {
    5
}

fn default_max_shuffle_attempts() -> usize {
    500
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            prop_informative: default_prop_informative(),
            max_consecutive_block_cues: default_max_consecutive(),
            max_consecutive_trial_cues: default_max_consecutive(),
            max_shuffle_attempts: default_max_shuffle_attempts(),
        }
    }
}

/// Timing jitter knobs (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitterConfig {
    /// Base inter-trial interval.
    #[serde(default = "default_iti")]
    pub iti: f64,
    /// Base cue to stimulus delay, only used with cues.
    #[serde(default)]
    pub cue_stim_delay: Option<f64>,
    /// Relative half-width of the uniform draw.
    #[serde(default = "default_spread")]
    pub spread: f64,
    /// Largest allowed difference between group means.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Redraws before keeping the closest attempt.
    #[serde(default = "default_jitter_attempts")]
    pub max_attempts: usize,
}

fn default_iti() -> f64 {
    1.0
}

fn default_spread() -> f64 {
    0.25
}

fn default_tolerance() -> f64 {
    0.001
}

fn default_jitter_attempts() -> usize {
    100_000
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            iti: default_iti(),
            cue_stim_delay: None,
            spread: default_spread(),
            tolerance: default_tolerance(),
            max_attempts: default_jitter_attempts(),
        }
    }
}

impl ExperimentConfig {
    /// Parses and validates a YAML configuration.
    pub fn from_yaml_str(contents: &str) -> Result<Self, TrialgenError> {
        let config: ExperimentConfig = serde_yaml::from_str(contents).map_err(|err| {
            TrialgenError::Config(ErrorInfo::new("experiment-config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, TrialgenError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| TrialgenError::io("experiment-config-read", err, path))?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            TrialgenError::Config(info) => {
                TrialgenError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Control exclusion the instantiator runs with. A configured distractor
    /// bias always uses [`ControlExclusion::Relations`], since strict
    /// exclusion vetoes repeated singleton locations.
    pub fn control_exclusion(&self) -> ControlExclusion {
        if self.bias.is_some() {
            ControlExclusion::Relations
        } else {
            self.control
        }
    }

    /// Optimizer configuration with the session's trial count applied.
    pub fn ga_config(&self) -> GaConfig {
        GaConfig {
            num_trials: self.session.n_trials,
            seed_policy: self.seed_policy.clone(),
            ..self.optimizer.clone()
        }
    }

    /// Rejects impossible combinations before any work starts.
    pub fn validate(&self) -> Result<(), TrialgenError> {
        let session = &self.session;
        if session.n_trials == 0 {
            return Err(TrialgenError::config(
                "session-trials",
                "n_trials must be positive",
                "n_trials",
                session.n_trials,
            ));
        }
        if session.n_blocks == 0 {
            return Err(TrialgenError::config(
                "session-blocks",
                "n_blocks must be positive",
                "n_blocks",
                session.n_blocks,
            ));
        }
        if session.n_locations < 2 {
            return Err(TrialgenError::config(
                "session-locations",
                "at least two locations are needed for a target and a singleton",
                "n_locations",
                session.n_locations,
            ));
        }
        if session.n_digits < session.n_locations {
            return Err(TrialgenError::Config(
                ErrorInfo::new("session-digits", "every location needs a distinct digit")
                    .with_context("n_digits", session.n_digits.to_string())
                    .with_context("n_locations", session.n_locations.to_string()),
            ));
        }
        self.ga_config().validate()?;
        self.singleton.validate()?;
        if let Some(bias) = &self.bias {
            if !(0.0..=1.0).contains(&bias.hp_distractor) {
                return Err(TrialgenError::config(
                    "bias-probability",
                    "hp_distractor must lie in [0, 1]",
                    "hp_distractor",
                    bias.hp_distractor,
                ));
            }
            for location in [bias.even_subject_location, bias.odd_subject_location] {
                if location == 0 || location > session.n_locations {
                    return Err(TrialgenError::config(
                        "bias-location",
                        "biased location is outside the loudspeaker range",
                        "location",
                        location,
                    ));
                }
            }
        }
        if let Some(cues) = &self.cues {
            if !(0.0..=1.0).contains(&cues.prop_informative) {
                return Err(TrialgenError::config(
                    "cue-proportion",
                    "prop_informative must lie in [0, 1]",
                    "prop_informative",
                    cues.prop_informative,
                ));
            }
            if cues.max_consecutive_block_cues == 0
                || cues.max_consecutive_trial_cues == 0
                || cues.max_shuffle_attempts == 0
            {
                return Err(TrialgenError::Config(ErrorInfo::new(
                    "cue-limits",
                    "cue run caps and shuffle attempts must be positive",
                )));
            }
        }
        self.jitter.params().validate()?;
        for (name, base) in [("iti", Some(self.jitter.iti)), ("cue_stim_delay", self.jitter.cue_stim_delay)] {
            if let Some(base) = base {
                if base <= 0.0 || !base.is_finite() {
                    return Err(TrialgenError::config(
                        "jitter-base",
                        "base durations must be positive",
                        name,
                        base,
                    ));
                }
            }
        }
        Ok(())
    }
}
