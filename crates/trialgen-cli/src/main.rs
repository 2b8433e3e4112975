use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    generate::{self, GenerateArgs},
    optimize::{self, OptimizeArgs},
    pool::{self, PoolArgs},
    verify::{self, VerifyArgs},
};

mod commands;
mod telemetry;

#[derive(Parser, Debug)]
#[command(name = "trialgen", about = "Constrained trial-sequence generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enumerate the condition pool and write it as CSV.
    Pool(PoolArgs),
    /// Run the category-sequence optimizer on its own.
    Optimize(OptimizeArgs),
    /// Generate every block of one subject.
    Generate(GenerateArgs),
    /// Check a block file and print a JSON report.
    Verify(VerifyArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Pool(args) => {
            telemetry::init_tracing(None)?;
            pool::run(&args)
        }
        Command::Optimize(args) => {
            telemetry::init_tracing(None)?;
            optimize::run(&args)
        }
        // Installs its own subscriber once the subject log directory exists.
        Command::Generate(args) => generate::run(&args),
        Command::Verify(args) => {
            telemetry::init_tracing(None)?;
            verify::run(&args)
        }
    }
}
