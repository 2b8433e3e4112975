use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tracing::info;
use trialgen_trials::ConditionPool;

#[derive(Args, Debug)]
pub struct PoolArgs {
    /// Number of distinct digits.
    #[arg(long, default_value_t = 9)]
    pub digits: u8,
    /// Number of loudspeaker locations (one role per location).
    #[arg(long, default_value_t = 3)]
    pub locations: u8,
    /// Output CSV path.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &PoolArgs) -> Result<(), Box<dyn Error>> {
    let pool = ConditionPool::enumerate(args.digits, args.locations)?;
    pool.write_csv(&args.out)?;
    info!(
        rows = pool.len(),
        roles = pool.roles(),
        path = %args.out.display(),
        "condition pool written"
    );
    Ok(())
}
