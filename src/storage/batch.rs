//! Batch file handling
//!
//! Plans where every source is written, then runs the read, split and write
//! pipeline one file at a time. Outputs are written atomically (temp file +
//! rename).

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::codec;
use crate::domain::{split_document, Convention, TextGrid, Variant};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error(
        "Several sources would be written to {}. Use a '*' or a directory ending in '/' as destination",
        .0.display()
    )]
    DestinationCollision(PathBuf),

    #[error(
        "{} is both a source and the destination of {}. Choose a destination outside the sources",
        .0.display(),
        .1.display()
    )]
    DestinationIsSource(PathBuf, PathBuf),

    #[error("Invalid destination '{0}': {1}")]
    InvalidDestination(String, &'static str),
}

/// Where split documents are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Overwrite each source
    InPlace,
    /// A file name next to each source, `*` standing for the source stem
    Template(String),
    /// A directory mirroring the source paths relative to the working directory
    Directory(PathBuf),
    /// One literal path
    File(PathBuf),
}

impl Destination {
    /// Interprets the `--destination` argument
    pub fn parse(arg: Option<&str>) -> Result<Self, BatchError> {
        let Some(arg) = arg else {
            return Ok(Destination::InPlace);
        };

        let wildcards = arg.matches('*').count();
        if wildcards > 1 {
            return Err(BatchError::InvalidDestination(
                arg.to_string(),
                "at most one '*' is allowed",
            ));
        }
        if wildcards == 1 {
            if arg.contains(['/', '\\']) {
                return Err(BatchError::InvalidDestination(
                    arg.to_string(),
                    "a '*' template cannot contain a directory",
                ));
            }
            return Ok(Destination::Template(arg.to_string()));
        }

        if arg.ends_with(['/', '\\']) {
            Ok(Destination::Directory(PathBuf::from(arg)))
        } else {
            Ok(Destination::File(PathBuf::from(arg)))
        }
    }

    /// Resolves the output path for one source
    pub fn resolve(&self, source: &Path, cwd: &Path) -> PathBuf {
        match self {
            Destination::InPlace => source.to_path_buf(),
            Destination::Template(template) => {
                let stem = source
                    .file_stem()
                    .map(|s| s.to_string_lossy())
                    .unwrap_or_default();
                let name = template.replace('*', &stem);
                match source.parent() {
                    Some(parent) => parent.join(name),
                    None => PathBuf::from(name),
                }
            }
            Destination::Directory(dir) => {
                let absolute = normalize(&cwd.join(source));
                match absolute.strip_prefix(normalize(cwd)) {
                    Ok(relative) => dir.join(relative),
                    // Sources outside the working directory keep only their name
                    Err(_) => dir.join(source.file_name().unwrap_or_default()),
                }
            }
            Destination::File(path) => path.clone(),
        }
    }
}

/// Lexically removes `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// One source and the path its split document is written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Resolves every destination before anything is read
///
/// Fails if two sources resolve to the same output path, or if one source's
/// output would overwrite another source before it is read.
pub fn plan(
    sources: &[PathBuf],
    destination: &Destination,
    cwd: &Path,
) -> Result<Vec<Job>, BatchError> {
    let inputs: Vec<PathBuf> = sources.iter().map(|s| normalize(&cwd.join(s))).collect();
    let mut seen = HashSet::new();
    let mut jobs = Vec::with_capacity(sources.len());

    for (index, source) in sources.iter().enumerate() {
        let output = destination.resolve(source, cwd);
        let target = normalize(&cwd.join(&output));

        let overwritten = inputs
            .iter()
            .enumerate()
            .find(|(other, input)| *other != index && **input == target);
        if let Some((other, _)) = overwritten {
            return Err(BatchError::DestinationIsSource(
                sources[other].clone(),
                source.clone(),
            ));
        }
        if !seen.insert(target) {
            return Err(BatchError::DestinationCollision(output));
        }
        jobs.push(Job {
            source: source.clone(),
            destination: output,
        });
    }

    Ok(jobs)
}

/// Per-run settings for the split pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitSettings {
    /// Output layout; the source's own layout when unset
    pub variant: Option<Variant>,
    /// Replace tiers already named like a destination tier
    pub replace_existing: bool,
}

/// What a successful split produced
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub document: TextGrid,
    pub bytes: Vec<u8>,
}

/// Decodes, splits and re-encodes one document held in memory
pub fn split_bytes(
    bytes: &[u8],
    convention: &Convention,
    settings: SplitSettings,
) -> Result<SplitOutcome> {
    let document = codec::decode(bytes)?;
    let document = split_document(document, convention, settings.replace_existing)?;

    let variant = settings.variant.unwrap_or(document.format.variant);
    let bytes = codec::encode_as(&document, variant);

    Ok(SplitOutcome { document, bytes })
}

/// Runs one job from source file to destination file
pub fn process(job: &Job, convention: &Convention, settings: SplitSettings) -> Result<SplitOutcome> {
    let bytes = fs::read(&job.source)
        .with_context(|| format!("Failed to read {}", job.source.display()))?;

    let outcome = split_bytes(&bytes, convention, settings)
        .with_context(|| format!("Failed to split {}", job.source.display()))?;

    write_atomic(&job.destination, &outcome.bytes)?;
    Ok(outcome)
}

/// Writes a file atomically (temp file + rename), creating parent directories
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = temp_path(path);

    fs::write(&temp_path, bytes)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        });
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const SOURCE: &str = "File type = \"ooTextFile\"
Object class = \"TextGrid\"

0
2
<exists>
1
\"IntervalTier\"
\"manual\"
0
2
2
0
1
\"re\"
1
2
\"pc\"
";

    fn convention() -> Convention {
        Convention::from_value(json!({
            "options": { "compact-tier": "manual" },
            "tags": {
                "r": ["Researcher"],
                "p": ["Participant"],
                "e": ["English"],
                "c": ["Welsh"]
            },
            "tiers": { "speaker": ["r", "p"], "language": ["e", "c"] }
        }))
        .unwrap()
    }

    #[test]
    fn parse_destinations() {
        assert_eq!(Destination::parse(None).unwrap(), Destination::InPlace);
        assert_eq!(
            Destination::parse(Some("*_split.TextGrid")).unwrap(),
            Destination::Template("*_split.TextGrid".to_string())
        );
        assert_eq!(
            Destination::parse(Some("out/")).unwrap(),
            Destination::Directory(PathBuf::from("out/"))
        );
        assert_eq!(
            Destination::parse(Some("out/all.TextGrid")).unwrap(),
            Destination::File(PathBuf::from("out/all.TextGrid"))
        );
    }

    #[test]
    fn reject_bad_templates() {
        assert!(matches!(
            Destination::parse(Some("*_*.TextGrid")),
            Err(BatchError::InvalidDestination(_, _))
        ));
        assert!(matches!(
            Destination::parse(Some("out/*.TextGrid")),
            Err(BatchError::InvalidDestination(_, _))
        ));
        assert!(matches!(
            Destination::parse(Some("out\\*.TextGrid")),
            Err(BatchError::InvalidDestination(_, _))
        ));
    }

    #[test]
    fn resolve_destinations() {
        let cwd = Path::new("/work");
        let source = Path::new("data/s1.TextGrid");

        assert_eq!(Destination::InPlace.resolve(source, cwd), source);
        assert_eq!(
            Destination::Template("*-split.TextGrid".to_string()).resolve(source, cwd),
            PathBuf::from("data/s1-split.TextGrid")
        );
        assert_eq!(
            Destination::Directory(PathBuf::from("out/")).resolve(source, cwd),
            PathBuf::from("out/data/s1.TextGrid")
        );
        assert_eq!(
            Destination::Directory(PathBuf::from("out/"))
                .resolve(Path::new("/elsewhere/s2.TextGrid"), cwd),
            PathBuf::from("out/s2.TextGrid")
        );
        assert_eq!(
            Destination::File(PathBuf::from("x.TextGrid")).resolve(source, cwd),
            PathBuf::from("x.TextGrid")
        );
    }

    #[test]
    fn plan_detects_collisions() {
        let cwd = Path::new("/work");
        let sources = vec![PathBuf::from("a.TextGrid"), PathBuf::from("b.TextGrid")];

        let err = plan(&sources, &Destination::File(PathBuf::from("out.TextGrid")), cwd)
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::DestinationCollision(PathBuf::from("out.TextGrid"))
        );

        let jobs = plan(&sources, &Destination::InPlace, cwd).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].destination, PathBuf::from("b.TextGrid"));
    }

    #[test]
    fn plan_collision_through_dot_segments() {
        let cwd = Path::new("/work");
        let sources = vec![PathBuf::from("a.TextGrid"), PathBuf::from("./a.TextGrid")];

        assert!(plan(&sources, &Destination::InPlace, cwd).is_err());
    }

    #[test]
    fn plan_rejects_destination_over_another_source() {
        let cwd = Path::new("/work");

        let sources = vec![
            PathBuf::from("a.TextGrid"),
            PathBuf::from("a_split.TextGrid"),
        ];
        let err = plan(
            &sources,
            &Destination::Template("*_split.TextGrid".to_string()),
            cwd,
        )
        .unwrap_err();
        assert_eq!(
            err,
            BatchError::DestinationIsSource(
                PathBuf::from("a_split.TextGrid"),
                PathBuf::from("a.TextGrid")
            )
        );

        let sources = vec![PathBuf::from("x.TextGrid"), PathBuf::from("out/x.TextGrid")];
        let err = plan(&sources, &Destination::Directory(PathBuf::from("out/")), cwd)
            .unwrap_err();
        assert!(matches!(err, BatchError::DestinationIsSource(_, _)));
    }

    #[test]
    fn split_bytes_keeps_layout() {
        let outcome = split_bytes(SOURCE.as_bytes(), &convention(), SplitSettings::default())
            .unwrap();

        let names: Vec<_> = outcome.document.tier_names().collect();
        assert_eq!(names, vec!["speaker", "language", "manual"]);

        let decoded = codec::decode(&outcome.bytes).unwrap();
        assert_eq!(decoded.format.variant, Variant::Short);
        assert_eq!(decoded, outcome.document);
    }

    #[test]
    fn split_bytes_variant_override() {
        let settings = SplitSettings {
            variant: Some(Variant::Long),
            replace_existing: false,
        };
        let outcome = split_bytes(SOURCE.as_bytes(), &convention(), settings).unwrap();

        let text = String::from_utf8(outcome.bytes).unwrap();
        assert!(text.contains("name = \"speaker\" "));
    }

    #[test]
    fn process_writes_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("s1.TextGrid");
        fs::write(&source, SOURCE).unwrap();

        let job = Job {
            source: source.clone(),
            destination: dir.path().join("out").join("s1.TextGrid"),
        };
        process(&job, &convention(), SplitSettings::default()).unwrap();

        let written = codec::decode(&fs::read(&job.destination).unwrap()).unwrap();
        assert!(written.tier("speaker").is_some());

        // Source untouched
        assert_eq!(fs::read_to_string(&source).unwrap(), SOURCE);
        assert!(!temp_path(&job.destination).exists());
    }

    #[test]
    fn failed_split_leaves_destination_alone() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("s1.TextGrid");
        fs::write(&source, SOURCE.replace("\"pc\"", "\"pq\"")).unwrap();

        let job = Job {
            source: source.clone(),
            destination: source.clone(),
        };
        let err = process(&job, &convention(), SplitSettings::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown tag 'q'"));

        assert_eq!(
            fs::read_to_string(&source).unwrap(),
            SOURCE.replace("\"pc\"", "\"pq\"")
        );
        assert!(!temp_path(&source).exists());
    }

    #[test]
    fn missing_source_reported() {
        let dir = TempDir::new().unwrap();
        let job = Job {
            source: dir.path().join("missing.TextGrid"),
            destination: dir.path().join("out.TextGrid"),
        };

        let err = process(&job, &convention(), SplitSettings::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
