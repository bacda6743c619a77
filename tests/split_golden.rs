//! Golden file tests for split output
//!
//! Split results are compared byte for byte with files in `tests/fixtures/`.
//! Praat reads these files back, so layout, encoding and line endings must
//! stay stable.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tiersplit::domain::Variant;
use tiersplit::storage::{self, SplitSettings};
use tiersplit::Convention;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> Vec<u8> {
    fs::read(Path::new(FIXTURES).join(name)).unwrap()
}

fn convention() -> Convention {
    Convention::load(Path::new(FIXTURES).join("bangor.json")).unwrap()
}

fn to_crlf(bytes: &[u8]) -> Vec<u8> {
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .replace('\n', "\r\n")
        .into_bytes()
}

fn to_utf16le(bytes: &[u8]) -> Vec<u8> {
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut out = vec![0xFF, 0xFE];
    out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
    out
}

/// Get a command instance for the tiersplit binary
fn tiersplit_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("tiersplit"));
    cmd.current_dir(dir)
        .env("TIERSPLIT_CONFIG_DIR", dir.join("config"))
        .env_remove("TIERSPLIT_CONVENTION");
    cmd
}

// =============================================================================
// Codec Stability
// =============================================================================

#[test]
fn fixtures_reencode_unchanged() {
    for name in [
        "interview.TextGrid",
        "interview_split.TextGrid",
        "interview_split_short.TextGrid",
    ] {
        let bytes = fixture(name);
        let document = storage::decode(&bytes).unwrap();
        assert_eq!(storage::encode(&document), bytes, "{} changed on re-encode", name);
    }
}

#[test]
fn long_and_short_fixtures_agree() {
    let long = storage::decode(&fixture("interview_split.TextGrid")).unwrap();
    let short = storage::decode(&fixture("interview_split_short.TextGrid")).unwrap();

    assert_eq!(long.tiers, short.tiers);
    assert_eq!(
        storage::encode_as(&long, Variant::Short),
        fixture("interview_split_short.TextGrid")
    );
}

// =============================================================================
// Split Output
// =============================================================================

#[test]
fn split_long_source() {
    let outcome = storage::split_bytes(
        &fixture("interview.TextGrid"),
        &convention(),
        SplitSettings::default(),
    )
    .unwrap();

    assert_eq!(outcome.bytes, fixture("interview_split.TextGrid"));
}

#[test]
fn split_short_source_stays_short() {
    let source = storage::decode(&fixture("interview.TextGrid")).unwrap();
    let short_source = storage::encode_as(&source, Variant::Short);

    let outcome =
        storage::split_bytes(&short_source, &convention(), SplitSettings::default()).unwrap();

    assert_eq!(outcome.bytes, fixture("interview_split_short.TextGrid"));
}

#[test]
fn split_preserves_crlf() {
    let outcome = storage::split_bytes(
        &to_crlf(&fixture("interview.TextGrid")),
        &convention(),
        SplitSettings::default(),
    )
    .unwrap();

    assert_eq!(outcome.bytes, to_crlf(&fixture("interview_split.TextGrid")));
}

#[test]
fn split_preserves_utf16_through_cli() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("interview.TextGrid"),
        to_utf16le(&fixture("interview.TextGrid")),
    )
    .unwrap();
    fs::write(dir.path().join("bangor.json"), fixture("bangor.json")).unwrap();

    tiersplit_cmd(dir.path())
        .args(["split", "interview.TextGrid", "-d", "*_split.TextGrid"])
        .args(["-c", "bangor.json"])
        .assert()
        .success();

    assert_eq!(
        fs::read(dir.path().join("interview_split.TextGrid")).unwrap(),
        to_utf16le(&fixture("interview_split.TextGrid"))
    );
}

#[test]
fn resplit_with_replace_is_stable() {
    let settings = SplitSettings {
        variant: None,
        replace_existing: true,
    };
    let outcome = storage::split_bytes(
        &fixture("interview_split.TextGrid"),
        &convention(),
        settings,
    )
    .unwrap();

    assert_eq!(outcome.bytes, fixture("interview_split.TextGrid"));
}
