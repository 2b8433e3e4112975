//! Subject and block orchestration plus the on-disk layout.
//!
//! A block is generated completely in memory first. Files are only written
//! once every stage succeeded, so a failed block leaves nothing behind.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, info_span, warn};
use trialgen_core::errors::ErrorInfo;
use trialgen_core::rng::streams;
use trialgen_core::{
    block_seed, derive_substream_seed, format_labels, RngHandle, SingletonPresence, TrialCategory,
    TrialRecord, TrialgenError,
};
use trialgen_ga::{
    insert_singleton_present, optimize, write_history_csv, GapHistogram, OptimizeSummary,
    RunManifest, SingletonOutcome,
};

use crate::bias::DistractorBias;
use crate::config::ExperimentConfig;
use crate::cues::{assign_cues, CueStrategy};
use crate::instantiate::{instantiate, Correction, InstantiateOptions};
use crate::jitter::balanced_jitter;
use crate::output::write_sequence_csv;
use crate::pool::ConditionPool;
use crate::report::SequenceTraits;

/// Everything produced for one block before it is written out.
#[derive(Debug, Clone)]
pub struct BlockOutcome {
    /// Subject the block belongs to.
    pub subject_id: u32,
    /// Block number.
    pub block: u32,
    /// Seed every stage of the block was derived from.
    pub seed: u64,
    /// Optimizer result.
    pub summary: OptimizeSummary,
    /// Singleton pass result for priming designs.
    pub singleton: Option<SingletonOutcome>,
    /// Instantiated trials with jitter and cues applied.
    pub records: Vec<TrialRecord>,
    /// Label corrections applied by the instantiator.
    pub corrections: Vec<Correction>,
    /// Summary counts.
    pub traits: SequenceTraits,
    /// Distances between singleton-present trials.
    pub sp_gaps: GapHistogram,
    /// Distances between Control trials.
    pub c_gaps: GapHistogram,
    /// Whether every jitter draw met its tolerance.
    pub jitter_balanced: bool,
    /// Cue strategy, when cues are configured.
    pub cue_strategy: Option<CueStrategy>,
}

/// Runs every stage for one block without touching the filesystem.
pub fn generate_block(
    config: &ExperimentConfig,
    pool: &ConditionPool,
    subject_id: u32,
    block: u32,
    seed: u64,
) -> Result<BlockOutcome, TrialgenError> {
    let _span = info_span!("block", subject_id, block).entered();
    let roles = usize::from(config.session.n_locations);
    if pool.roles() != roles {
        return Err(TrialgenError::Pool(
            ErrorInfo::new("pool-roles", "pool does not match the configured number of locations")
                .with_context("pool_roles", pool.roles().to_string())
                .with_context("n_locations", roles.to_string()),
        ));
    }

    let ga = config.ga_config();
    let summary = optimize(&ga, derive_substream_seed(seed, streams::OPTIMIZER))?;
    let singleton = if ga.design.needs_singleton_pass() {
        Some(insert_singleton_present(
            &summary.labels,
            &config.singleton,
            derive_substream_seed(seed, streams::SINGLETON),
        )?)
    } else {
        None
    };
    let labels = singleton
        .as_ref()
        .map_or_else(|| summary.labels.clone(), |outcome| outcome.labels.clone());

    let control = config.control_exclusion();
    if control != config.control {
        info!(
            configured = ?config.control,
            effective = ?control,
            "distractor bias switches control exclusion"
        );
    }
    let options = InstantiateOptions {
        control,
        bias: config
            .bias
            .as_ref()
            .map(|bias| DistractorBias::for_subject(bias, subject_id)),
    };
    let instantiation = instantiate(
        &labels,
        pool,
        &options,
        &mut RngHandle::substream(seed, streams::INSTANTIATE),
    )?;
    let mut records = instantiation.records;
    let presence: Vec<SingletonPresence> = records.iter().map(TrialRecord::presence).collect();

    let params = config.jitter.params();
    let iti = balanced_jitter(
        &presence,
        config.jitter.iti,
        &params,
        &mut RngHandle::substream(seed, streams::ITI_JITTER),
    );
    let mut jitter_balanced = iti.balanced;
    for (record, value) in records.iter_mut().zip(iti.values) {
        record.iti_jitter = Some(value);
    }
    if let Some(base) = config.jitter.cue_stim_delay {
        let delay = balanced_jitter(
            &presence,
            base,
            &params,
            &mut RngHandle::substream(seed, streams::CUE_JITTER),
        );
        jitter_balanced &= delay.balanced;
        for (record, value) in records.iter_mut().zip(delay.values) {
            record.cue_stim_delay_jitter = Some(value);
        }
    }

    let cue_strategy = config.cues.as_ref().map(|cues| {
        let strategy = CueStrategy::for_subject(subject_id);
        let assignment = assign_cues(
            strategy,
            block,
            &presence,
            cues,
            &mut RngHandle::substream(seed, streams::CUES),
        );
        for (record, cue) in records.iter_mut().zip(assignment.cues) {
            record.cue_instruction = Some(cue);
        }
        strategy
    });

    let traits = SequenceTraits::from_records(&records);
    traits.log(subject_id, block);
    let sp_indices: Vec<usize> = positions(&records, |r| r.presence().is_present());
    let c_indices: Vec<usize> =
        positions(&records, |r| r.label.category == TrialCategory::Control);

    Ok(BlockOutcome {
        subject_id,
        block,
        seed,
        summary,
        singleton,
        records,
        corrections: instantiation.corrections,
        traits,
        sp_gaps: GapHistogram::from_indices(&sp_indices),
        c_gaps: GapHistogram::from_indices(&c_indices),
        jitter_balanced,
        cue_strategy,
    })
}

fn positions(records: &[TrialRecord], keep: impl Fn(&TrialRecord) -> bool) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| keep(record))
        .map(|(index, _)| index)
        .collect()
}

/// Output directory of one subject: `sub-<id>/` with a `logs/` child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectLayout {
    subject_id: u32,
    dir: PathBuf,
}

impl SubjectLayout {
    /// Creates a fresh layout. An existing subject directory is rejected
    /// unless its only entry is the `logs/` directory left by a run that
    /// failed before writing its first block.
    pub fn prepare(root: &Path, subject_id: u32) -> Result<Self, TrialgenError> {
        let layout = Self::at(root, subject_id);
        if layout.dir.exists() {
            let entries = fs::read_dir(&layout.dir)
                .map_err(|err| TrialgenError::io("layout-read", err, &layout.dir))?;
            let mut occupied = false;
            for entry in entries {
                let entry = entry.map_err(|err| TrialgenError::io("layout-read", err, &layout.dir))?;
                if entry.path() != layout.logs_dir() || !entry.path().is_dir() {
                    occupied = true;
                    break;
                }
            }
            if occupied {
                return Err(TrialgenError::Layout(
                    ErrorInfo::new("layout-not-empty", "subject directory already exists")
                        .with_context("path", layout.dir.display().to_string())
                        .with_hint("pick another subject id or resume with --start-block"),
                ));
            }
        }
        fs::create_dir_all(layout.logs_dir())
            .map_err(|err| TrialgenError::io("layout-mkdir", err, &layout.logs_dir()))?;
        Ok(layout)
    }

    /// Reuses an existing layout when resuming at a later block.
    pub fn open(root: &Path, subject_id: u32) -> Result<Self, TrialgenError> {
        let layout = Self::at(root, subject_id);
        if !layout.dir.is_dir() {
            return Err(TrialgenError::Layout(
                ErrorInfo::new("layout-missing", "subject directory does not exist")
                    .with_context("path", layout.dir.display().to_string()),
            ));
        }
        fs::create_dir_all(layout.logs_dir())
            .map_err(|err| TrialgenError::io("layout-mkdir", err, &layout.logs_dir()))?;
        Ok(layout)
    }

    fn at(root: &Path, subject_id: u32) -> Self {
        Self {
            subject_id,
            dir: root.join(format!("sub-{subject_id}")),
        }
    }

    /// Subject id.
    pub fn subject_id(&self) -> u32 {
        self.subject_id
    }

    /// `sub-<id>/`.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `sub-<id>/logs/`.
    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    /// Sequence file of `block`.
    pub fn block_csv(&self, block: u32) -> PathBuf {
        self.dir.join(format!("sub-{}_block_{block}.csv", self.subject_id))
    }

    fn log_file(&self, block: u32, suffix: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("sub-{}_block-{block}_{suffix}", self.subject_id))
    }

    /// Optimizer fitness history of `block`.
    pub fn fitness_csv(&self, block: u32) -> PathBuf {
        self.log_file(block, "fitness.csv")
    }

    /// Singleton-present gap histogram of `block`.
    pub fn sp_gaps_csv(&self, block: u32) -> PathBuf {
        self.log_file(block, "sp_gaps.csv")
    }

    /// Control gap histogram of `block`.
    pub fn c_gaps_csv(&self, block: u32) -> PathBuf {
        self.log_file(block, "c_gaps.csv")
    }

    /// Optimizer manifest of `block`.
    pub fn manifest_json(&self, block: u32) -> PathBuf {
        self.log_file(block, "manifest.json")
    }

    /// Plain-text log shared by all blocks of the subject.
    pub fn sequence_log(&self) -> PathBuf {
        self.logs_dir()
            .join(format!("sub-{}_trial_sequence_log.txt", self.subject_id))
    }
}

/// Generates and writes blocks `start_block..n_blocks` for one subject.
pub fn run_subject(
    config: &ExperimentConfig,
    pool: &ConditionPool,
    layout: &SubjectLayout,
    start_block: u32,
) -> Result<Vec<BlockOutcome>, TrialgenError> {
    config.validate()?;
    let subject_id = layout.subject_id();
    let mut outcomes = Vec::new();
    for block in start_block..config.session.n_blocks {
        let target = layout.block_csv(block);
        if target.exists() {
            return Err(TrialgenError::Layout(
                ErrorInfo::new("layout-block-exists", "block file already exists")
                    .with_context("path", target.display().to_string()),
            ));
        }
        let seed = block_seed(config.seed_policy.master_seed, subject_id, block);
        let outcome = generate_block(config, pool, subject_id, block, seed)?;
        write_block(config, layout, &outcome)?;
        info!(
            subject_id,
            block,
            path = %target.display(),
            corrections = outcome.corrections.len(),
            "block written"
        );
        outcomes.push(outcome);
    }
    if outcomes.is_empty() {
        warn!(
            start_block,
            n_blocks = config.session.n_blocks,
            "no blocks left to generate"
        );
    }
    Ok(outcomes)
}

/// Writes every artefact of a generated block.
pub fn write_block(
    config: &ExperimentConfig,
    layout: &SubjectLayout,
    outcome: &BlockOutcome,
) -> Result<(), TrialgenError> {
    let block = outcome.block;
    let fitness_path = layout.fitness_csv(block);
    write_history_csv(&outcome.summary.history, &fitness_path)?;
    outcome.sp_gaps.write_csv(&layout.sp_gaps_csv(block))?;
    outcome.c_gaps.write_csv(&layout.c_gaps_csv(block))?;

    let ga = config.ga_config();
    let history_name = fitness_path.file_name().map(PathBuf::from);
    let manifest = RunManifest::from_summary(
        &ga,
        derive_substream_seed(outcome.seed, streams::OPTIMIZER),
        &outcome.summary,
        history_name,
    )?;
    manifest.write(&layout.manifest_json(block))?;

    let log_path = layout.sequence_log();
    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|err| TrialgenError::io("sequence-log-open", err, &log_path))?;
    let labels: Vec<_> = outcome.records.iter().map(|record| record.label).collect();
    let mut text = outcome.traits.to_text(outcome.subject_id, block);
    text.push_str(&format!("corrections: {}\n", outcome.corrections.len()));
    text.push_str(&format!("labels: {}\n\n", format_labels(&labels)));
    log.write_all(text.as_bytes())
        .map_err(|err| TrialgenError::io("sequence-log-write", err, &log_path))?;

    write_sequence_csv(
        &outcome.records,
        usize::from(config.session.n_locations),
        &layout.block_csv(block),
    )
}
