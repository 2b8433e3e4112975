use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::info;
use trialgen_core::format_labels;
use trialgen_ga::{optimize, write_history_csv, GaConfig, RunManifest};

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// YAML optimizer configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Seed overriding `seed_policy.master_seed`.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Output directory for run artefacts.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &OptimizeArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = GaConfig::load(&args.config)?;
    let seed = args.seed.unwrap_or(config.seed_policy.master_seed);
    let summary = optimize(&config, seed)?;

    fs::write(
        args.out.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    write_history_csv(&summary.history, &args.out.join("fitness.csv"))?;
    let manifest =
        RunManifest::from_summary(&config, seed, &summary, Some(PathBuf::from("fitness.csv")))?;
    manifest.write(&args.out.join("manifest.json"))?;
    fs::copy(&args.config, args.out.join("config.yaml")).ok();

    info!(
        seed,
        fitness = summary.fitness.normalized,
        generations = summary.generations_completed,
        labels = %format_labels(&summary.labels),
        "optimizer run written"
    );
    Ok(())
}
