use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tracing::warn;
use trialgen_trials::{read_sequence_csv, verify_sequence, ExperimentConfig, VerifyOptions};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Block CSV to check.
    #[arg(long)]
    pub input: PathBuf,
    /// Experiment configuration enabling proportion and run-cap checks.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &VerifyArgs) -> Result<(), Box<dyn Error>> {
    let records = read_sequence_csv(&args.input)?;
    let options = match &args.config {
        Some(path) => VerifyOptions::from_config(&ExperimentConfig::load(path)?),
        None => VerifyOptions::default(),
    };
    let report = verify_sequence(&records, &options);
    println!("{}", serde_json::to_string_pretty(&report)?);

    let failed: Vec<&str> = report.failures().map(|check| check.name.as_str()).collect();
    if failed.is_empty() {
        return Ok(());
    }
    for check in report.failures() {
        warn!(check = %check.name, detail = %check.detail, "check failed");
    }
    Err(format!("{} check(s) failed: {}", failed.len(), failed.join(", ")).into())
}
