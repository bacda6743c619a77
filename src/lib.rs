//! tiersplit - Expand compact annotation tiers in Praat TextGrids
//!
//! Annotators often mark several categories at once (speaker, language,
//! comments) with terse one-character codes on a single "compact" tier.
//! A JSON convention maps each code character to a value and to the tiers
//! that value belongs on; tiersplit turns every compact interval into one
//! aligned interval per destination tier.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{expand_code, split_document, Convention, TextGrid};
