//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{config_cmd, convention_cmd, preview, split};
use crate::domain::Variant;

#[derive(Parser)]
#[command(name = "tiersplit")]
#[command(
    author,
    version,
    about = "Expand compact annotation tiers in Praat TextGrids"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split the compact tier of TextGrid files into one tier per category
    Split {
        /// TextGrid files to split
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Output path: a name with '*' for the source stem, a directory ending
        /// in '/', or a single file (default: overwrite the sources)
        #[arg(long, short = 'd')]
        destination: Option<String>,

        /// Convention file (default: the configured default convention)
        #[arg(long, short = 'c', env = "TIERSPLIT_CONVENTION")]
        convention: Option<PathBuf>,

        /// Layout of the written files (default: same as each source)
        #[arg(long, value_enum)]
        variant: Option<Variant>,

        /// Overwrite existing destination files without asking
        #[arg(long, short = 'y')]
        yes: bool,

        /// Replace tiers that already carry a destination tier's name
        #[arg(long)]
        replace_tiers: bool,

        /// Continue with the remaining files after a failure
        #[arg(long)]
        keep_going: bool,
    },

    /// Show how compact codes expand, without touching any file
    Preview {
        /// Compact codes to expand
        #[arg(required = true)]
        codes: Vec<String>,

        /// Convention file (default: the configured default convention)
        #[arg(long, short = 'c', env = "TIERSPLIT_CONVENTION")]
        convention: Option<PathBuf>,
    },

    /// Validate and inspect convention files
    #[command(subcommand)]
    Convention(convention_cmd::ConventionCommands),

    /// Manage persisted settings
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    output.verbose("tiersplit starting");

    match cli.command {
        Commands::Split {
            sources,
            destination,
            convention,
            variant,
            yes,
            replace_tiers,
            keep_going,
        } => {
            let args = split::SplitArgs {
                sources,
                destination,
                convention,
                variant,
                yes,
                replace_tiers,
                keep_going,
            };
            split::run(args, &output)?
        }

        Commands::Preview { codes, convention } => {
            output.verbose_ctx("preview", &format!("Previewing {} code(s)", codes.len()));
            preview::run(&output, &codes, convention.as_deref())?
        }

        Commands::Convention(cmd) => convention_cmd::run(cmd, &output)?,
        Commands::Config(cmd) => config_cmd::run(cmd, &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}
