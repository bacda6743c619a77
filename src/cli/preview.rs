//! Preview command: expand codes without touching any file

use std::path::Path;

use anyhow::{Context, Result};

use super::convention_cmd::load_convention;
use super::output::Output;
use crate::domain::expand_code;

pub fn run(output: &Output, codes: &[String], convention: Option<&Path>) -> Result<()> {
    let convention = load_convention(convention, output)?;

    let mut expansions = Vec::with_capacity(codes.len());
    for code in codes {
        let expansion = expand_code(code, &convention)
            .with_context(|| format!("Failed to expand '{}'", code))?;
        expansions.push((code, expansion));
    }

    if output.is_json() {
        let items: Vec<_> = expansions
            .iter()
            .map(|(code, expansion)| {
                let tiers: Vec<_> = expansion
                    .iter()
                    .map(|(tier, text)| serde_json::json!({ "tier": tier, "text": text }))
                    .collect();
                serde_json::json!({ "code": code, "tiers": tiers })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    let width = convention
        .tier_names()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0);

    for (index, (code, expansion)) in expansions.iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("{:?}", code);
        for (tier, text) in expansion.iter() {
            println!("  {:<width$}  {:?}", tier, text, width = width);
        }
    }

    Ok(())
}
