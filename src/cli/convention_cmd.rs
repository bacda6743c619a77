//! Convention CLI commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Convention, TagKind};
use crate::storage::Config;

#[derive(Subcommand)]
pub enum ConventionCommands {
    /// Check that a convention file is valid
    Check {
        /// Convention file
        file: PathBuf,
    },

    /// Show the tags and tiers of a convention
    Show {
        /// Convention file
        file: PathBuf,
    },
}

pub fn run(cmd: ConventionCommands, output: &Output) -> Result<()> {
    match cmd {
        ConventionCommands::Check { file } => check(output, &file),
        ConventionCommands::Show { file } => show(output, &file),
    }
}

/// Loads the convention named on the command line, or the configured default
pub(super) fn load_convention(arg: Option<&Path>, output: &Output) -> Result<Convention> {
    let path = match arg {
        Some(path) => path.to_path_buf(),
        None => {
            let config = Config::load()?;
            output.verbose_ctx(
                "convention",
                &format!("No convention given, reading {}", config.config_path().display()),
            );
            config.global.default_convention.ok_or_else(|| {
                anyhow::anyhow!(
                    "No convention given. Pass --convention or set a default with \
                     'tiersplit config default-convention FILE'"
                )
            })?
        }
    };

    output.verbose_ctx("convention", &format!("Loading {}", path.display()));
    let convention = Convention::load(&path)
        .with_context(|| format!("Failed to load convention: {}", path.display()))?;
    output.verbose_ctx(
        "convention",
        &format!(
            "{} tag(s), {} special tag(s), {} tier(s), compact tier '{}'",
            convention.tags().len(),
            convention.special_tags().len(),
            convention.tiers().len(),
            convention.compact_tier()
        ),
    );

    Ok(convention)
}

fn check(output: &Output, file: &Path) -> Result<()> {
    let convention = load_convention(Some(file), output)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "valid": true,
            "file": file.display().to_string(),
            "compact_tier": convention.compact_tier(),
            "tags": convention.tags().len(),
            "special_tags": convention.special_tags().len(),
            "tiers": convention.tier_names().collect::<Vec<_>>(),
        }));
    } else {
        output.success(&format!(
            "{} is valid: {} tag(s), {} special tag(s), {} tier(s)",
            file.display(),
            convention.tags().len(),
            convention.special_tags().len(),
            convention.tiers().len()
        ));
    }

    Ok(())
}

fn show(output: &Output, file: &Path) -> Result<()> {
    let convention = load_convention(Some(file), output)?;
    let meta = convention.meta();
    let options = convention.options();

    if output.is_json() {
        let tags: Vec<_> = convention
            .tags()
            .iter()
            .map(|(c, spec)| {
                serde_json::json!({
                    "tag": c.to_string(),
                    "value": spec.value,
                    "label": spec.label,
                })
            })
            .collect();
        let special_tags: Vec<_> = convention
            .special_tags()
            .iter()
            .map(|(c, spec)| {
                serde_json::json!({
                    "tag": c.to_string(),
                    "function": spec.function.as_str(),
                    "preserve": spec.preserve,
                    "output": spec.output,
                })
            })
            .collect();
        let tiers: Vec<_> = convention
            .tiers()
            .iter()
            .map(|tier| {
                serde_json::json!({
                    "name": tier.name,
                    "tags": tier.tags.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();

        output.data(&serde_json::json!({
            "meta": meta,
            "options": options,
            "tags": tags,
            "special_tags": special_tags,
            "tiers": tiers,
        }));
        return Ok(());
    }

    if let Some(name) = &meta.name {
        match &meta.version {
            Some(version) => println!("{} (version {})", name, version),
            None => println!("{}", name),
        }
    }
    if let Some(description) = &meta.description {
        println!("{}", description);
    }
    if meta.name.is_some() || meta.description.is_some() {
        println!();
    }

    println!("Compact tier:   {}", options.compact_tier);
    println!(
        "Retain compact: {}",
        if options.retain_compact { "yes" } else { "no" }
    );
    println!(
        "Case sensitive: {}",
        if options.case_sensitive { "yes" } else { "no" }
    );
    println!("Tag separator:  {:?}", options.tag_separator);

    for tier in convention.tiers() {
        println!();
        println!("{}", tier.name);
        for &c in &tier.tags {
            match convention.resolve(c) {
                Some(TagKind::Regular { value, .. }) => println!("  {}  {}", c, value),
                Some(TagKind::PartSeparator { output: text, .. }) => {
                    println!("  {}  part separator {:?}", c, text)
                }
                Some(TagKind::Comment { preserve, .. }) => println!(
                    "  {}  comment{}",
                    c,
                    if *preserve { "" } else { " (not preserved)" }
                ),
                None => {}
            }
        }
    }

    Ok(())
}
