//! TextGrid document model
//!
//! A TextGrid is an ordered list of tiers sharing one time domain. Interval
//! tiers partition `[xmin, xmax]` into contiguous labelled intervals; point
//! (text) tiers hold labelled instants and are carried through untouched.
//!
//! Time values remember the literal they were read from so that documents
//! re-encode byte for byte. Reading and writing lives in
//! [`crate::storage::codec`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A time value in seconds together with its textual form
#[derive(Debug, Clone)]
pub struct Time {
    seconds: f64,
    literal: String,
}

impl Time {
    /// Creates a time value, formatted as the shortest round-tripping decimal
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds,
            literal: format!("{}", seconds),
        }
    }

    /// Parses a numeric literal, keeping its exact spelling
    ///
    /// Returns `None` for anything that is not a finite number.
    pub fn parse(literal: &str) -> Option<Self> {
        let seconds: f64 = literal.parse().ok()?;
        if !seconds.is_finite() {
            return None;
        }

        Some(Self {
            seconds,
            literal: literal.to_string(),
        })
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Returns the literal this value is written as
    pub fn literal(&self) -> &str {
        &self.literal
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.seconds == other.seconds
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.seconds.partial_cmp(&other.seconds)
    }
}

impl From<f64> for Time {
    fn from(seconds: f64) -> Self {
        Self::new(seconds)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// Textual layout of a TextGrid file
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// `key = value` lines with indented items
    #[default]
    Long,
    /// One bare value per line
    Short,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Long => "long",
            Variant::Short => "short",
        }
    }
}

/// Header line style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Header {
    /// `File type = "ooTextFile"` followed by `Object class = "TextGrid"`
    #[default]
    Standard,
    /// `File type = "ooTextFile short"` followed by a bare `"TextGrid"`
    LegacyShort,
}

/// Character encoding of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Be,
    Utf16Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Everything about a file's physical form that encoding must reproduce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileFormat {
    pub variant: Variant,
    pub header: Header,
    pub encoding: TextEncoding,
    pub line_ending: LineEnding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub start: Time,
    pub end: Time,
    pub text: String,
}

impl Interval {
    pub fn new(start: impl Into<Time>, end: impl Into<Time>, text: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub time: Time,
    pub mark: String,
}

impl Point {
    pub fn new(time: impl Into<Time>, mark: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            mark: mark.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTier {
    pub name: String,
    pub xmin: Time,
    pub xmax: Time,
    pub intervals: Vec<Interval>,
}

impl IntervalTier {
    /// Creates a tier from intervals, taking its bounds from the first and last one
    ///
    /// An empty tier gets the bounds `[0, 0]`.
    pub fn new(name: impl Into<String>, intervals: Vec<Interval>) -> Self {
        let xmin = intervals
            .first()
            .map(|i| i.start.clone())
            .unwrap_or_else(|| Time::new(0.0));
        let xmax = intervals
            .last()
            .map(|i| i.end.clone())
            .unwrap_or_else(|| Time::new(0.0));

        Self {
            name: name.into(),
            xmin,
            xmax,
            intervals,
        }
    }
}

/// A point tier, called "TextTier" in the file format
#[derive(Debug, Clone, PartialEq)]
pub struct PointTier {
    pub name: String,
    pub xmin: Time,
    pub xmax: Time,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tier {
    Interval(IntervalTier),
    Point(PointTier),
}

impl Tier {
    pub fn name(&self) -> &str {
        match self {
            Tier::Interval(t) => &t.name,
            Tier::Point(t) => &t.name,
        }
    }

    pub fn xmin(&self) -> &Time {
        match self {
            Tier::Interval(t) => &t.xmin,
            Tier::Point(t) => &t.xmin,
        }
    }

    pub fn xmax(&self) -> &Time {
        match self {
            Tier::Interval(t) => &t.xmax,
            Tier::Point(t) => &t.xmax,
        }
    }

    /// Returns the class name used in the file format
    pub fn class(&self) -> &'static str {
        match self {
            Tier::Interval(_) => "IntervalTier",
            Tier::Point(_) => "TextTier",
        }
    }

    pub fn as_interval(&self) -> Option<&IntervalTier> {
        match self {
            Tier::Interval(t) => Some(t),
            Tier::Point(_) => None,
        }
    }

    /// Checks the ordering and bounds of this tier's entries
    fn check(&self) -> Result<(), String> {
        if self.xmin() > self.xmax() {
            return Err(format!(
                "tier '{}' ends ({}) before it starts ({})",
                self.name(),
                self.xmax(),
                self.xmin()
            ));
        }

        match self {
            Tier::Interval(tier) => {
                let mut boundary = &tier.xmin;
                for (index, interval) in tier.intervals.iter().enumerate() {
                    if interval.start != *boundary {
                        return Err(format!(
                            "interval {} of tier '{}' starts at {} but the previous boundary is {}",
                            index + 1,
                            tier.name,
                            interval.start,
                            boundary
                        ));
                    }
                    if interval.end < interval.start {
                        return Err(format!(
                            "interval {} of tier '{}' ends ({}) before it starts ({})",
                            index + 1,
                            tier.name,
                            interval.end,
                            interval.start
                        ));
                    }
                    boundary = &interval.end;
                }
                if !tier.intervals.is_empty() && *boundary != tier.xmax {
                    return Err(format!(
                        "last interval of tier '{}' ends at {} instead of {}",
                        tier.name, boundary, tier.xmax
                    ));
                }
            }
            Tier::Point(tier) => {
                let mut previous = &tier.xmin;
                for (index, point) in tier.points.iter().enumerate() {
                    if point.time < *previous || point.time > tier.xmax {
                        return Err(format!(
                            "point {} of tier '{}' at {} is out of order or out of bounds",
                            index + 1,
                            tier.name,
                            point.time
                        ));
                    }
                    previous = &point.time;
                }
            }
        }

        Ok(())
    }
}

impl From<IntervalTier> for Tier {
    fn from(tier: IntervalTier) -> Self {
        Tier::Interval(tier)
    }
}

impl From<PointTier> for Tier {
    fn from(tier: PointTier) -> Self {
        Tier::Point(tier)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextGrid {
    pub xmin: Time,
    pub xmax: Time,
    pub tiers: Vec<Tier>,
    pub format: FileFormat,
}

impl TextGrid {
    /// Creates an empty document with the default file format
    pub fn new(xmin: impl Into<Time>, xmax: impl Into<Time>) -> Self {
        Self {
            xmin: xmin.into(),
            xmax: xmax.into(),
            tiers: Vec::new(),
            format: FileFormat::default(),
        }
    }

    /// Appends a tier, builder style
    pub fn with_tier(mut self, tier: impl Into<Tier>) -> Self {
        self.tiers.push(tier.into());
        self
    }

    /// Returns the first tier with the given name
    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name() == name)
    }

    pub fn tier_names(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|t| t.name())
    }

    /// Verifies the structural invariants of the document
    ///
    /// Every tier must be ordered and contiguous, and the document bounds
    /// must be exactly the union of the tier bounds.
    pub fn check(&self) -> Result<(), String> {
        if self.xmin > self.xmax {
            return Err(format!(
                "document ends ({}) before it starts ({})",
                self.xmax, self.xmin
            ));
        }

        for tier in &self.tiers {
            tier.check()?;
        }

        let lowest = self.tiers.iter().map(|t| t.xmin()).min_by(|a, b| {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        });
        let highest = self.tiers.iter().map(|t| t.xmax()).max_by(|a, b| {
            a.partial_cmp(b).unwrap_or(Ordering::Equal)
        });

        if let (Some(lowest), Some(highest)) = (lowest, highest) {
            if *lowest != self.xmin || *highest != self.xmax {
                return Err(format!(
                    "document bounds [{}, {}] do not match the tier bounds [{}, {}]",
                    self.xmin, self.xmax, lowest, highest
                ));
            }
        }

        Ok(())
    }
}
