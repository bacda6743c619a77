//! Split command: the batch pipeline over TextGrid files

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use super::convention_cmd::load_convention;
use super::output::Output;
use crate::domain::Variant;
use crate::storage::{self, Config, Destination, SplitSettings};

pub struct SplitArgs {
    pub sources: Vec<PathBuf>,
    pub destination: Option<String>,
    pub convention: Option<PathBuf>,
    pub variant: Option<Variant>,
    pub yes: bool,
    pub replace_tiers: bool,
    pub keep_going: bool,
}

#[derive(Serialize)]
struct Report {
    source: String,
    destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tiers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: SplitArgs, output: &Output) -> Result<()> {
    let convention = load_convention(args.convention.as_deref(), output)?;

    for source in &args.sources {
        if !source.is_file() {
            anyhow::bail!("Source file not found: {}", source.display());
        }
    }

    let destination = Destination::parse(args.destination.as_deref())?;
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let jobs = storage::plan(&args.sources, &destination, &cwd)?;
    output.verbose_ctx(
        "split",
        &format!("Planned {} file(s), destination {:?}", jobs.len(), destination),
    );

    let variant = match args.variant {
        Some(variant) => Some(variant),
        None => Config::load()?.global.default_variant,
    };
    let settings = SplitSettings {
        variant,
        replace_existing: args.replace_tiers,
    };

    let existing: Vec<_> = jobs
        .iter()
        .filter(|job| job.destination.exists())
        .collect();
    if !existing.is_empty() && !args.yes {
        eprintln!("These files will be overwritten:");
        for job in &existing {
            eprintln!("  {}", job.destination.display());
        }
        if !output.confirm("Continue?")? {
            anyhow::bail!("Aborted, no files were written");
        }
    }

    let mut reports = Vec::with_capacity(jobs.len());
    let mut failures = 0;

    for job in &jobs {
        output.verbose_ctx(
            "split",
            &format!("{} -> {}", job.source.display(), job.destination.display()),
        );

        match storage::process(job, &convention, settings) {
            Ok(outcome) => {
                if !output.is_json() {
                    println!(
                        "{} -> {} ({} tiers)",
                        job.source.display(),
                        job.destination.display(),
                        outcome.document.tiers.len()
                    );
                }
                reports.push(Report {
                    source: job.source.display().to_string(),
                    destination: job.destination.display().to_string(),
                    tiers: Some(outcome.document.tiers.len()),
                    error: None,
                });
            }
            Err(e) if args.keep_going => {
                failures += 1;
                output.error(&format!("{:#}", e));
                reports.push(Report {
                    source: job.source.display().to_string(),
                    destination: job.destination.display().to_string(),
                    tiers: None,
                    error: Some(format!("{:#}", e)),
                });
            }
            Err(e) => return Err(e),
        }
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "files": reports,
            "split": jobs.len() - failures,
            "failed": failures,
        }));
    }

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed", failures, jobs.len());
    }

    if !output.is_json() {
        output.success(&format!("Split {} file(s)", jobs.len()));
    }
    Ok(())
}
