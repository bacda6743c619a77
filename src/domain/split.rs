//! Splitting a whole document
//!
//! Runs every interval of the compact tier through the parser and the
//! expansion fold, then hands the collected texts to the assembler.

use thiserror::Error;

use super::assemble::{self, AssembleError, AssembleOptions, ExpandedTier};
use super::code::{self, CodeError};
use super::convention::Convention;
use super::expand::expand;
use super::textgrid::TextGrid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    /// `interval` is one-based, `position` is the zero-based character offset
    #[error("Unknown tag '{tag}' at position {position} of interval {interval} in tier '{tier}'")]
    UnknownTag {
        tier: String,
        interval: usize,
        tag: char,
        position: usize,
    },

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Expands the compact tier of `document` following `convention`
///
/// With `replace_existing`, tiers already named like a destination tier are
/// removed instead of failing the split.
pub fn split_document(
    document: TextGrid,
    convention: &Convention,
    replace_existing: bool,
) -> Result<TextGrid, SplitError> {
    let compact_name = convention.compact_tier();
    let compact = assemble::compact_tier(&document, compact_name)?;

    let mut expanded: Vec<ExpandedTier> = convention
        .tier_names()
        .map(|name| ExpandedTier {
            name: name.to_string(),
            texts: Vec::with_capacity(compact.intervals.len()),
        })
        .collect();

    for (index, interval) in compact.intervals.iter().enumerate() {
        let contributions = code::parse(&interval.text, convention).map_err(|e| match e {
            CodeError::UnknownTag { tag, position } => SplitError::UnknownTag {
                tier: compact_name.to_string(),
                interval: index + 1,
                tag,
                position,
            },
        })?;

        let expansion = expand(
            &contributions,
            convention.tier_names(),
            convention.tag_separator(),
        );
        for (tier, text) in expanded.iter_mut().zip(expansion.into_texts()) {
            tier.texts.push(text);
        }
    }

    let options = AssembleOptions {
        retain_compact: convention.options().retain_compact,
        replace_existing,
    };

    Ok(assemble::assemble(
        document,
        compact_name,
        expanded,
        options,
    )?)
}
