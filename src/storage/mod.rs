//! # Storage Layer
//!
//! Everything that touches bytes and files.
//!
//! ## Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Annotations | Praat TextGrid (long or short text layout) | anywhere |
//! | Conventions | JSON | anywhere, see [`crate::domain::Convention`] |
//! | Config | TOML | `<config dir>/config.toml` |
//!
//! ## Safety
//!
//! - Destinations are planned for the whole batch before any file is read
//! - All writes are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`decode`] / [`encode`] - TextGrid codec preserving layout, encoding and line endings
//! - [`Destination`] / [`plan`] - Mapping sources to output paths
//! - [`Config`] - Global configuration

mod batch;
pub mod codec;
mod config;

pub use batch::{
    plan, process, split_bytes, write_atomic, BatchError, Destination, Job, SplitOutcome,
    SplitSettings,
};
pub use codec::{decode, encode, encode_as, TextGridError};
pub use config::{Config, ConfigError, GlobalConfig, CONFIG_DIR_ENV};
