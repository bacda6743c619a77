//! Compact code parsing
//!
//! A compact code is the text of one interval on the compact tier, e.g.
//! `rexpc-Truck noise`. Each character is resolved against the convention
//! and turned into zero or more [`Contribution`]s, one per destination tier
//! the character feeds.

use thiserror::Error;

use super::convention::{CommentRemainder, Convention, TagKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeError {
    /// `position` is the zero-based character index within the code
    #[error("Unknown tag '{tag}' at position {position}")]
    UnknownTag { tag: char, position: usize },
}

/// One fragment of output text bound for a destination tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution<'a> {
    pub tier: &'a str,
    pub text: &'a str,
    /// Inserted verbatim, never joined with the tag separator
    pub is_separator: bool,
}

/// Scans a compact code left to right
///
/// A preserved comment tag ends the scan: everything after it becomes one
/// literal contribution for the comment's tiers.
pub fn parse<'a>(
    code: &'a str,
    convention: &'a Convention,
) -> Result<Vec<Contribution<'a>>, CodeError> {
    let mut contributions = Vec::new();

    for (position, (offset, c)) in code.char_indices().enumerate() {
        let kind = convention
            .resolve(c)
            .ok_or(CodeError::UnknownTag { tag: c, position })?;

        match kind {
            TagKind::Regular { value, tiers } => {
                emit(&mut contributions, convention, tiers, value, false);
            }
            TagKind::PartSeparator {
                preserve,
                output,
                tiers,
            } => {
                if *preserve {
                    emit(&mut contributions, convention, tiers, output, true);
                }
            }
            TagKind::Comment {
                preserve: true,
                tiers,
            } => {
                let rest = &code[offset + c.len_utf8()..];
                emit(&mut contributions, convention, tiers, rest, true);
                return Ok(contributions);
            }
            TagKind::Comment {
                preserve: false, ..
            } => {
                if convention.options().comment_remainder == CommentRemainder::Discard {
                    return Ok(contributions);
                }
            }
        }
    }

    Ok(contributions)
}

fn emit<'a>(
    contributions: &mut Vec<Contribution<'a>>,
    convention: &'a Convention,
    tiers: &[usize],
    text: &'a str,
    is_separator: bool,
) {
    let specs = convention.tiers();
    contributions.extend(tiers.iter().map(|&index| Contribution {
        tier: specs[index].name.as_str(),
        text,
        is_separator,
    }));
}
