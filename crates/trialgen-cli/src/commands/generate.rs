use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tracing::info;
use trialgen_trials::{run_subject, ConditionPool, ExperimentConfig, SubjectLayout};

use crate::telemetry;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// YAML experiment configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Condition pool CSV written by `trialgen pool`.
    #[arg(long)]
    pub pool: PathBuf,
    /// Subject identifier; its parity selects bias location and cue strategy.
    #[arg(long)]
    pub subject: u32,
    /// First block to generate. Values above zero resume an existing subject.
    #[arg(long, default_value_t = 0)]
    pub start_block: u32,
    /// Root directory receiving `sub-<id>/`.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &GenerateArgs) -> Result<(), Box<dyn Error>> {
    let config = ExperimentConfig::load(&args.config)?;
    let pool = ConditionPool::read_csv(&args.pool)?;
    let layout = if args.start_block == 0 {
        SubjectLayout::prepare(&args.out, args.subject)?
    } else {
        SubjectLayout::open(&args.out, args.subject)?
    };
    telemetry::init_tracing(Some(&layout.logs_dir().join("trialgen.log")))?;

    info!(
        subject = args.subject,
        start_block = args.start_block,
        n_blocks = config.session.n_blocks,
        pool_rows = pool.len(),
        "generating subject"
    );
    let outcomes = run_subject(&config, &pool, &layout, args.start_block)?;
    let corrections: usize = outcomes.iter().map(|outcome| outcome.corrections.len()).sum();
    info!(
        blocks = outcomes.len(),
        corrections,
        dir = %layout.dir().display(),
        "subject complete"
    );
    Ok(())
}
