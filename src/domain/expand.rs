//! Tier expansion
//!
//! Folds the contributions of one compact code into one string per
//! destination tier. Regular values landing in the same tier are joined
//! with the convention's tag separator; separator contributions are
//! inserted verbatim and restart the joining.

use super::code::{self, CodeError, Contribution};
use super::convention::Convention;

/// Expanded text per destination tier, in convention order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    tiers: Vec<(String, String)>,
}

impl Expansion {
    /// Returns the text for a tier, if the tier was expanded
    pub fn get(&self, tier: &str) -> Option<&str> {
        self.tiers
            .iter()
            .find(|(name, _)| name == tier)
            .map(|(_, text)| text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tiers.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn into_texts(self) -> impl Iterator<Item = String> {
        self.tiers.into_iter().map(|(_, text)| text)
    }
}

/// Folds contributions into one string for each tier of `tiers_order`
///
/// Tiers without contributions get the empty string.
pub fn expand<'t>(
    contributions: &[Contribution<'_>],
    tiers_order: impl IntoIterator<Item = &'t str>,
    tag_separator: &str,
) -> Expansion {
    let tiers = tiers_order
        .into_iter()
        .map(|tier| (tier.to_string(), fold(contributions, tier, tag_separator)))
        .collect();

    Expansion { tiers }
}

fn fold(contributions: &[Contribution<'_>], tier: &str, tag_separator: &str) -> String {
    let mut text = String::new();
    let mut joinable = false;

    for contribution in contributions.iter().filter(|c| c.tier == tier) {
        if contribution.is_separator {
            text.push_str(contribution.text);
            joinable = false;
        } else {
            if joinable {
                text.push_str(tag_separator);
            }
            text.push_str(contribution.text);
            joinable = true;
        }
    }

    text
}

/// Parses and expands one compact code against a convention
pub fn expand_code(code: &str, convention: &Convention) -> Result<Expansion, CodeError> {
    let contributions = code::parse(code, convention)?;
    Ok(expand(
        &contributions,
        convention.tier_names(),
        convention.tag_separator(),
    ))
}
