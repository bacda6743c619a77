//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `split` | Expand the compact tier of TextGrid files |
//! | `preview` | Expand codes on the command line |
//! | `convention check`, `convention show` | Validate and inspect conventions |
//! | `config default-convention`, `config show`, `config reset` | Persisted settings |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! tiersplit --verbose split recording.TextGrid -d '*_split.TextGrid'
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod config_cmd;
mod convention_cmd;
mod output;
mod preview;
mod split;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
