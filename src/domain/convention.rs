//! Annotation conventions
//!
//! A convention maps single-character tags to expansion values and assigns
//! each tag to destination tiers. Conventions are stored as JSON:
//!
//! ```json
//! {
//!   "meta": { "name": "Example", "version": "1.0" },
//!   "options": { "compact-tier": "manual", "tag-separator": "," },
//!   "special-tags": {
//!     "x": { "function": "part-separator", "preserve": true, "output": " / " },
//!     "-": { "function": "comment", "preserve": true }
//!   },
//!   "tags": { "r": ["Researcher", "Researcher speaking"], "e": ["English"] },
//!   "tiers": { "speaker": ["r"], "language": ["e"], "comment": ["-"] }
//! }
//! ```
//!
//! Loading resolves every tag character once into a [`TagKind`] lookup
//! table. After loading a convention is immutable.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConventionError {
    #[error("Malformed convention: {0}")]
    Malformed(String),

    #[error("Failed to read convention file: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Descriptive information, ignored during expansion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub name: Option<String>,
    pub version: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
}

/// What happens to the text after a comment tag that is not preserved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentRemainder {
    /// Keep reading the remainder as tags
    #[default]
    Scan,
    /// Drop the remainder
    Discard,
}

fn default_true() -> bool {
    true
}

fn default_tag_separator() -> String {
    ",".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Options {
    /// Name of the interval tier holding the compact codes
    pub compact_tier: String,

    /// Keep the compact tier after the expanded tiers
    #[serde(default = "default_true")]
    pub retain_compact: bool,

    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Joins two regular tag values landing in the same tier
    #[serde(default = "default_tag_separator")]
    pub tag_separator: String,

    #[serde(default)]
    pub comment_remainder: CommentRemainder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialFunction {
    PartSeparator,
    Comment,
}

impl SpecialFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialFunction::PartSeparator => "part-separator",
            SpecialFunction::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecialTagSpec {
    pub function: SpecialFunction,
    #[serde(default)]
    pub preserve: bool,
    #[serde(default)]
    pub output: String,
}

/// A regular tag, written as `["Value"]` or `["Value", "Label"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TagSpec {
    pub value: String,
    pub label: String,
}

impl TryFrom<Vec<String>> for TagSpec {
    type Error = String;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(value), label, None) => Ok(Self {
                value,
                label: label.unwrap_or_default(),
            }),
            _ => Err("a tag must be [value] or [value, label]".to_string()),
        }
    }
}

impl From<TagSpec> for Vec<String> {
    fn from(tag: TagSpec) -> Self {
        vec![tag.value, tag.label]
    }
}

/// JSON object that keeps its key order and rejects duplicate keys
#[derive(Debug, Clone, PartialEq)]
struct OrderedMap<V>(Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, V)> = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate key '{}'",
                            key
                        )));
                    }
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// The persisted shape of a convention
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConventionFile {
    #[serde(default)]
    meta: Meta,
    options: Options,
    #[serde(default)]
    special_tags: OrderedMap<SpecialTagSpec>,
    tags: OrderedMap<TagSpec>,
    tiers: OrderedMap<Vec<String>>,
}

/// A destination tier and the tags it collects, in convention order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSpec {
    pub name: String,
    pub tags: Vec<char>,
}

/// How a tag character behaves while scanning a compact code
///
/// `tiers` holds indices into [`Convention::tiers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
    Regular {
        value: String,
        tiers: Vec<usize>,
    },
    PartSeparator {
        preserve: bool,
        output: String,
        tiers: Vec<usize>,
    },
    Comment {
        preserve: bool,
        tiers: Vec<usize>,
    },
}

/// A loaded, validated annotation convention
#[derive(Debug, Clone)]
pub struct Convention {
    meta: Meta,
    options: Options,
    tags: Vec<(char, TagSpec)>,
    special_tags: Vec<(char, SpecialTagSpec)>,
    tiers: Vec<TierSpec>,
    lookup: HashMap<char, TagKind>,
}

/// Lowercases a character when it maps to exactly one character
fn fold_case(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn tag_char(key: &str, section: &str) -> Result<char, ConventionError> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConventionError::Malformed(format!(
            "{} key '{}' must be exactly one character",
            section, key
        ))),
    }
}

impl Convention {
    /// Loads a convention from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConventionError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConventionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&content)
    }

    /// Parses a convention from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ConventionError> {
        let file: ConventionFile =
            serde_json::from_str(json).map_err(|e| ConventionError::Malformed(e.to_string()))?;
        Self::from_file(file)
    }

    /// Builds a convention from an already parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConventionError> {
        let file: ConventionFile =
            serde_json::from_value(value).map_err(|e| ConventionError::Malformed(e.to_string()))?;
        Self::from_file(file)
    }

    fn from_file(file: ConventionFile) -> Result<Self, ConventionError> {
        let options = file.options;
        if options.compact_tier.is_empty() {
            return Err(ConventionError::Malformed(
                "compact-tier must not be empty".to_string(),
            ));
        }

        let case_sensitive = options.case_sensitive;
        let fold = |c: char| if case_sensitive { c } else { fold_case(c) };

        let mut tags: Vec<(char, TagSpec)> = Vec::new();
        for (key, spec) in file.tags.0 {
            let c = fold(tag_char(&key, "tags")?);
            if tags.iter().any(|(t, _)| *t == c) {
                return Err(ConventionError::Malformed(format!(
                    "tag '{}' is defined more than once (tags are case-insensitive)",
                    key
                )));
            }
            tags.push((c, spec));
        }

        let mut special_tags: Vec<(char, SpecialTagSpec)> = Vec::new();
        for (key, spec) in file.special_tags.0 {
            let c = fold(tag_char(&key, "special-tags")?);
            if tags.iter().any(|(t, _)| *t == c) {
                return Err(ConventionError::Malformed(format!(
                    "'{}' is defined both as a tag and as a special tag",
                    key
                )));
            }
            if special_tags.iter().any(|(t, _)| *t == c) {
                return Err(ConventionError::Malformed(format!(
                    "special tag '{}' is defined more than once (tags are case-insensitive)",
                    key
                )));
            }
            special_tags.push((c, spec));
        }

        let mut tiers: Vec<TierSpec> = Vec::new();
        for (name, keys) in file.tiers.0 {
            let mut tier_tags: Vec<char> = Vec::new();
            for key in keys {
                let c = fold(tag_char(&key, &format!("tier '{}'", name))?);
                let known = tags.iter().any(|(t, _)| *t == c)
                    || special_tags.iter().any(|(t, _)| *t == c);
                if !known {
                    return Err(ConventionError::Malformed(format!(
                        "tier '{}' references undefined tag '{}'",
                        name, key
                    )));
                }
                if !tier_tags.contains(&c) {
                    tier_tags.push(c);
                }
            }
            tiers.push(TierSpec {
                name,
                tags: tier_tags,
            });
        }

        let lookup = build_lookup(&tags, &special_tags, &tiers);

        Ok(Self {
            meta: file.meta,
            options,
            tags,
            special_tags,
            tiers,
            lookup,
        })
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn compact_tier(&self) -> &str {
        &self.options.compact_tier
    }

    pub fn tag_separator(&self) -> &str {
        &self.options.tag_separator
    }

    /// Regular tags, keyed by their (folded) character
    pub fn tags(&self) -> &[(char, TagSpec)] {
        &self.tags
    }

    pub fn special_tags(&self) -> &[(char, SpecialTagSpec)] {
        &self.special_tags
    }

    /// Destination tiers in convention order
    pub fn tiers(&self) -> &[TierSpec] {
        &self.tiers
    }

    pub fn tier_names(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|t| t.name.as_str())
    }

    /// Looks up the behavior of a character found in a compact code
    pub fn resolve(&self, c: char) -> Option<&TagKind> {
        let c = if self.options.case_sensitive {
            c
        } else {
            fold_case(c)
        };
        self.lookup.get(&c)
    }
}

fn build_lookup(
    tags: &[(char, TagSpec)],
    special_tags: &[(char, SpecialTagSpec)],
    tiers: &[TierSpec],
) -> HashMap<char, TagKind> {
    let listing = |c: char| -> Vec<usize> {
        tiers
            .iter()
            .enumerate()
            .filter(|(_, tier)| tier.tags.contains(&c))
            .map(|(index, _)| index)
            .collect()
    };

    // Tiers that collect at least one regular tag
    let content_tiers: Vec<usize> = tiers
        .iter()
        .enumerate()
        .filter(|(_, tier)| tier.tags.iter().any(|c| tags.iter().any(|(t, _)| t == c)))
        .map(|(index, _)| index)
        .collect();

    let mut lookup = HashMap::new();

    for (c, spec) in tags {
        lookup.insert(
            *c,
            TagKind::Regular {
                value: spec.value.clone(),
                tiers: listing(*c),
            },
        );
    }

    for (c, spec) in special_tags {
        let listed = listing(*c);
        let kind = match spec.function {
            SpecialFunction::PartSeparator => TagKind::PartSeparator {
                preserve: spec.preserve,
                output: spec.output.clone(),
                // An unlisted separator splits every content tier
                tiers: if listed.is_empty() {
                    content_tiers.clone()
                } else {
                    listed
                },
            },
            SpecialFunction::Comment => TagKind::Comment {
                preserve: spec.preserve,
                tiers: listed,
            },
        };
        lookup.insert(*c, kind);
    }

    lookup
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lart() -> serde_json::Value {
        json!({
            "meta": { "name": "LART", "version": "5" },
            "options": { "compact-tier": "manual" },
            "special-tags": {
                "x": { "function": "part-separator", "preserve": true, "output": " / " },
                "-": { "function": "comment", "preserve": true }
            },
            "tags": {
                "r": ["Researcher", "Researcher speaking"],
                "p": ["Participant"],
                "e": ["English", "English language"],
                "c": ["Welsh", "Cymraeg"]
            },
            "tiers": {
                "speaker": ["r", "p"],
                "language": ["e", "c"],
                "comment": ["-"]
            }
        })
    }

    #[test]
    fn load_with_defaults() {
        let convention = Convention::from_value(lart()).unwrap();

        assert_eq!(convention.compact_tier(), "manual");
        assert!(convention.options().retain_compact);
        assert!(convention.options().case_sensitive);
        assert_eq!(convention.tag_separator(), ",");
        assert_eq!(
            convention.options().comment_remainder,
            CommentRemainder::Scan
        );
        assert_eq!(convention.meta().name.as_deref(), Some("LART"));
    }

    #[test]
    fn tiers_keep_file_order() {
        let convention = Convention::from_value(lart()).unwrap();
        let names: Vec<_> = convention.tier_names().collect();
        assert_eq!(names, vec!["speaker", "language", "comment"]);
    }

    #[test]
    fn resolve_tags() {
        let convention = Convention::from_value(lart()).unwrap();

        assert_eq!(
            convention.resolve('r'),
            Some(&TagKind::Regular {
                value: "Researcher".to_string(),
                tiers: vec![0],
            })
        );
        assert_eq!(
            convention.resolve('-'),
            Some(&TagKind::Comment {
                preserve: true,
                tiers: vec![2],
            })
        );
        assert_eq!(convention.resolve('z'), None);
        // Case-sensitive by default
        assert_eq!(convention.resolve('R'), None);
    }

    #[test]
    fn unlisted_separator_targets_content_tiers() {
        let convention = Convention::from_value(lart()).unwrap();

        match convention.resolve('x') {
            Some(TagKind::PartSeparator { tiers, .. }) => assert_eq!(tiers, &vec![0, 1]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn listed_separator_targets_listing_tiers() {
        let mut data = lart();
        data["tiers"]["speaker"] = json!(["r", "p", "x"]);
        let convention = Convention::from_value(data).unwrap();

        match convention.resolve('x') {
            Some(TagKind::PartSeparator { tiers, .. }) => assert_eq!(tiers, &vec![0]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn case_insensitive_matching() {
        let mut data = lart();
        data["options"]["case-sensitive"] = json!(false);
        let researcher = data["tags"].as_object_mut().unwrap().remove("r").unwrap();
        data["tags"]["R"] = researcher;
        data["tiers"]["speaker"] = json!(["R", "p"]);

        let convention = Convention::from_value(data).unwrap();

        let upper = convention.resolve('R').cloned();
        let lower = convention.resolve('r').cloned();
        assert!(upper.is_some());
        assert_eq!(upper, lower);
        // Output values keep their case
        match lower {
            Some(TagKind::Regular { value, .. }) => assert_eq!(value, "Researcher"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn case_folding_collision_rejected() {
        let mut data = lart();
        data["options"]["case-sensitive"] = json!(false);
        data["tags"]["R"] = json!(["Recorder"]);

        let err = Convention::from_value(data).unwrap_err();
        assert!(matches!(err, ConventionError::Malformed(_)));
    }

    #[test]
    fn missing_compact_tier_rejected() {
        let mut data = lart();
        data["options"] = json!({ "retain-compact": false });

        assert!(matches!(
            Convention::from_value(data),
            Err(ConventionError::Malformed(_))
        ));
    }

    #[test]
    fn missing_tiers_rejected() {
        let mut data = lart();
        data.as_object_mut().unwrap().remove("tiers");

        assert!(Convention::from_value(data).is_err());
    }

    #[test]
    fn special_tags_optional() {
        let data = json!({
            "options": { "compact-tier": "manual" },
            "tags": { "a": ["A"] },
            "tiers": { "letters": ["a"] }
        });

        let convention = Convention::from_value(data).unwrap();
        assert!(convention.special_tags().is_empty());
        assert_eq!(convention.meta(), &Meta::default());
    }

    #[test]
    fn multi_character_tag_rejected() {
        let mut data = lart();
        data["tags"]["rr"] = json!(["Double"]);

        let err = Convention::from_value(data).unwrap_err();
        assert!(err.to_string().contains("exactly one character"));
    }

    #[test]
    fn tag_and_special_tag_collision_rejected() {
        let mut data = lart();
        data["tags"]["x"] = json!(["Extra"]);

        let err = Convention::from_value(data).unwrap_err();
        assert!(err.to_string().contains("both as a tag and as a special tag"));
    }

    #[test]
    fn unknown_tier_reference_rejected() {
        let mut data = lart();
        data["tiers"]["speaker"] = json!(["r", "q"]);

        let err = Convention::from_value(data).unwrap_err();
        assert!(err.to_string().contains("undefined tag 'q'"));
    }

    #[test]
    fn duplicate_tier_name_rejected() {
        let json = r#"{
            "options": { "compact-tier": "manual" },
            "tags": { "a": ["A"] },
            "tiers": { "letters": ["a"], "letters": ["a"] }
        }"#;

        let err = Convention::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn bad_special_function_rejected() {
        let mut data = lart();
        data["special-tags"]["x"]["function"] = json!("overlap");

        assert!(Convention::from_value(data).is_err());
    }

    #[test]
    fn tag_with_too_many_parts_rejected() {
        let mut data = lart();
        data["tags"]["r"] = json!(["Researcher", "label", "extra"]);

        assert!(Convention::from_value(data).is_err());
    }

    #[test]
    fn load_missing_file() {
        let err = Convention::load("/nonexistent/convention.json").unwrap_err();
        assert!(matches!(err, ConventionError::Read { .. }));
    }
}
