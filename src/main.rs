//! tiersplit - Expand compact annotation tiers in Praat TextGrids

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = tiersplit::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
