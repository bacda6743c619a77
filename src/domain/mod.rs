//! Domain models for tiersplit
//!
//! Contains the conventions, the TextGrid document model and the expansion
//! logic, without any I/O concerns.

mod assemble;
mod code;
mod convention;
mod expand;
mod split;
mod textgrid;

pub use assemble::{assemble, compact_tier, AssembleError, AssembleOptions, ExpandedTier};
pub use code::{parse, CodeError, Contribution};
pub use convention::{
    CommentRemainder, Convention, ConventionError, Meta, Options, SpecialFunction,
    SpecialTagSpec, TagKind, TagSpec, TierSpec,
};
pub use expand::{expand, expand_code, Expansion};
pub use split::{split_document, SplitError};
pub use textgrid::{
    FileFormat, Header, Interval, IntervalTier, LineEnding, Point, PointTier, TextEncoding,
    TextGrid, Tier, Time, Variant,
};
