//! Config CLI commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::Convention;
use crate::storage::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set the convention used when none is given
    DefaultConvention {
        /// Convention file
        file: PathBuf,
    },

    /// Show the current settings
    Show,

    /// Restore the default settings
    Reset {
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

pub fn run(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::DefaultConvention { file } => set_default_convention(output, &file),
        ConfigCommands::Show => show(output),
        ConfigCommands::Reset { yes } => reset(output, yes),
    }
}

fn set_default_convention(output: &Output, file: &Path) -> Result<()> {
    // Only valid conventions are stored, by absolute path
    Convention::load(file)
        .with_context(|| format!("Failed to load convention: {}", file.display()))?;
    let file = file
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", file.display()))?;

    let mut config = Config::load()?;
    output.verbose_ctx("config", &format!("Writing {}", config.config_path().display()));
    config.global.default_convention = Some(file.clone());
    config.save()?;

    output.success(&format!("Default convention set to {}", file.display()));
    Ok(())
}

fn show(output: &Output) -> Result<()> {
    let config = Config::load()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "config_path": config.config_path().display().to_string(),
            "default_convention": config.global.default_convention,
            "default_variant": config.global.default_variant,
        }));
        return Ok(());
    }

    println!("Config file:        {}", config.config_path().display());
    println!(
        "Default convention: {}",
        config
            .global
            .default_convention
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!(
        "Default variant:    {}",
        config
            .global
            .default_variant
            .map(|v| v.as_str())
            .unwrap_or("(same as source)")
    );

    Ok(())
}

fn reset(output: &Output, yes: bool) -> Result<()> {
    let mut config = Config::load()?;

    if !yes && !output.confirm("Reset all settings to their defaults?")? {
        anyhow::bail!("Aborted");
    }

    if config.reset()? {
        output.success("Settings reset to defaults");
    } else {
        output.success("Settings already at their defaults");
    }
    Ok(())
}
