//! Document assembly
//!
//! Rebuilds a TextGrid around the expanded tiers: each new tier copies the
//! compact tier's boundaries, the new tiers take the compact tier's place,
//! and the compact tier itself is kept right after them or dropped.

use thiserror::Error;

use super::textgrid::{Interval, IntervalTier, TextGrid, Tier};

fn point_tier_note(point_tier: &bool) -> &'static str {
    if *point_tier {
        " (it is a point tier)"
    } else {
        ""
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Missing compact interval tier '{name}'{}", point_tier_note(.point_tier))]
    MissingTier { name: String, point_tier: bool },

    #[error("A tier named '{0}' already exists")]
    DuplicateTier(String),

    #[error("Tier '{tier}' has {found} texts but the compact tier has {expected} intervals")]
    IntervalCountMismatch {
        tier: String,
        expected: usize,
        found: usize,
    },
}

/// Texts for one new tier, one per compact interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedTier {
    pub name: String,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssembleOptions {
    /// Keep the compact tier after the new tiers
    pub retain_compact: bool,
    /// Remove existing tiers that share a name with a new tier
    pub replace_existing: bool,
}

/// Returns the named compact tier, or why it cannot be used
pub fn compact_tier<'a>(
    document: &'a TextGrid,
    name: &str,
) -> Result<&'a IntervalTier, AssembleError> {
    locate_compact(document, name).map(|(_, tier)| tier)
}

/// The compact tier together with its index in the document
fn locate_compact<'a>(
    document: &'a TextGrid,
    name: &str,
) -> Result<(usize, &'a IntervalTier), AssembleError> {
    let missing = |point_tier| AssembleError::MissingTier {
        name: name.to_string(),
        point_tier,
    };

    let position = document
        .tiers
        .iter()
        .position(|t| t.name() == name)
        .ok_or_else(|| missing(false))?;
    match &document.tiers[position] {
        Tier::Interval(tier) => Ok((position, tier)),
        Tier::Point(_) => Err(missing(true)),
    }
}

/// Inserts the expanded tiers at the compact tier's position
///
/// Fails before touching the document, so an error never leaves a
/// half-assembled result.
pub fn assemble(
    document: TextGrid,
    compact_name: &str,
    expanded: Vec<ExpandedTier>,
    options: AssembleOptions,
) -> Result<TextGrid, AssembleError> {
    let (position, compact) = locate_compact(&document, compact_name)?;

    for (index, tier) in expanded.iter().enumerate() {
        if tier.texts.len() != compact.intervals.len() {
            return Err(AssembleError::IntervalCountMismatch {
                tier: tier.name.clone(),
                expected: compact.intervals.len(),
                found: tier.texts.len(),
            });
        }
        if expanded[..index].iter().any(|t| t.name == tier.name) {
            return Err(AssembleError::DuplicateTier(tier.name.clone()));
        }
        // The compact tier itself can never be replaced
        if tier.name == compact_name && options.retain_compact {
            return Err(AssembleError::DuplicateTier(tier.name.clone()));
        }
    }

    let is_new_name = |name: &str| expanded.iter().any(|t| t.name == name);

    if !options.replace_existing {
        let clash = document
            .tiers
            .iter()
            .enumerate()
            .find(|(index, t)| *index != position && is_new_name(t.name()));
        if let Some((_, tier)) = clash {
            return Err(AssembleError::DuplicateTier(tier.name().to_string()));
        }
    }

    let new_tiers: Vec<Tier> = expanded
        .iter()
        .map(|tier| {
            Tier::Interval(IntervalTier {
                name: tier.name.clone(),
                xmin: compact.xmin.clone(),
                xmax: compact.xmax.clone(),
                intervals: compact
                    .intervals
                    .iter()
                    .zip(&tier.texts)
                    .map(|(interval, text)| Interval {
                        start: interval.start.clone(),
                        end: interval.end.clone(),
                        text: text.clone(),
                    })
                    .collect(),
            })
        })
        .collect();

    let TextGrid {
        xmin,
        xmax,
        tiers,
        format,
    } = document;

    let mut new_tiers = Some(new_tiers);
    let mut assembled = Vec::with_capacity(tiers.len() + expanded.len());

    for (index, tier) in tiers.into_iter().enumerate() {
        if index == position {
            assembled.extend(new_tiers.take().unwrap_or_default());
            if options.retain_compact {
                assembled.push(tier);
            }
        } else if !is_new_name(tier.name()) {
            assembled.push(tier);
        }
    }

    Ok(TextGrid {
        xmin,
        xmax,
        tiers: assembled,
        format,
    })
}
