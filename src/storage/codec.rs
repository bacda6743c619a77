//! TextGrid reading and writing
//!
//! Praat writes TextGrids in two text layouts. The long layout names every
//! field:
//!
//! ```text
//! File type = "ooTextFile"
//! Object class = "TextGrid"
//!
//! xmin = 0
//! xmax = 2.3
//! tiers? <exists>
//! size = 1
//! item []:
//!     item [1]:
//!         class = "IntervalTier"
//!         name = "manual"
//!         xmin = 0
//!         xmax = 2.3
//!         intervals: size = 1
//!         intervals [1]:
//!             xmin = 0
//!             xmax = 2.3
//!             text = "rexp"
//! ```
//!
//! The short layout writes the same values one per line without names.
//! Both layouts share one document walk; the layout only decides how a
//! single field is read ([`LongReader`], [`ShortReader`]) or written
//! ([`LongWriter`], [`ShortWriter`]).
//!
//! Quotes inside text are doubled and text may span several lines.

use thiserror::Error;

use crate::domain::{
    FileFormat, Header, Interval, IntervalTier, LineEnding, Point, PointTier, TextEncoding,
    TextGrid, Tier, Time, Variant,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextGridError {
    #[error("Malformed TextGrid at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Malformed TextGrid: {0}")]
    Structure(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedVariant(String),
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];

/// Decodes a TextGrid file, detecting its encoding and layout
pub fn decode(bytes: &[u8]) -> Result<TextGrid, TextGridError> {
    let (text, encoding) = decode_text(bytes)?;
    // Quoted text may hold either line ending; the header line never does
    let first_line = text.split_inclusive('\n').next().unwrap_or_default();
    let line_ending = if first_line.ends_with("\r\n") {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    };

    let mut scanner = Scanner::new(&text);
    let (variant, header) = read_header(&mut scanner)?;

    let (xmin, xmax, tiers) = match variant {
        Variant::Long => read_document(&mut LongReader { scanner }),
        Variant::Short => read_document(&mut ShortReader { scanner }),
    }?;

    let document = TextGrid {
        xmin,
        xmax,
        tiers,
        format: FileFormat {
            variant,
            header,
            encoding,
            line_ending,
        },
    };
    document.check().map_err(TextGridError::Structure)?;

    Ok(document)
}

/// Encodes a document in its own file format
pub fn encode(document: &TextGrid) -> Vec<u8> {
    encode_as(document, document.format.variant)
}

/// Encodes a document in the given layout, keeping its encoding and line endings
pub fn encode_as(document: &TextGrid, variant: Variant) -> Vec<u8> {
    let newline = document.format.line_ending.as_str();
    let text = match variant {
        Variant::Long => {
            let mut writer = LongWriter::new(newline);
            write_header(&mut writer.out, Header::Standard, newline);
            write_document(&mut writer, document);
            writer.out
        }
        Variant::Short => {
            let mut writer = ShortWriter::new(newline);
            write_header(&mut writer.out, document.format.header, newline);
            write_document(&mut writer, document);
            writer.out
        }
    };

    encode_text(&text, document.format.encoding)
}

fn decode_text(bytes: &[u8]) -> Result<(String, TextEncoding), TextGridError> {
    let utf16 = |body: &[u8], from_bytes: fn([u8; 2]) -> u16| {
        if body.len() % 2 != 0 {
            return Err(TextGridError::Structure(
                "odd number of bytes in UTF-16 text".to_string(),
            ));
        }
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| from_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map_err(|_| TextGridError::Structure("invalid UTF-16 text".to_string()))
    };

    if let Some(body) = bytes.strip_prefix(UTF16_BE_BOM) {
        Ok((utf16(body, u16::from_be_bytes)?, TextEncoding::Utf16Be))
    } else if let Some(body) = bytes.strip_prefix(UTF16_LE_BOM) {
        Ok((utf16(body, u16::from_le_bytes)?, TextEncoding::Utf16Le))
    } else if let Some(body) = bytes.strip_prefix(UTF8_BOM) {
        let text = std::str::from_utf8(body)
            .map_err(|e| TextGridError::Structure(format!("invalid UTF-8 text: {}", e)))?;
        Ok((text.to_string(), TextEncoding::Utf8Bom))
    } else {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| TextGridError::Structure(format!("invalid UTF-8 text: {}", e)))?;
        Ok((text.to_string(), TextEncoding::Utf8))
    }
}

fn encode_text(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf8Bom => [UTF8_BOM, text.as_bytes()].concat(),
        TextEncoding::Utf16Be => {
            let mut bytes = UTF16_BE_BOM.to_vec();
            bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            bytes
        }
        TextEncoding::Utf16Le => {
            let mut bytes = UTF16_LE_BOM.to_vec();
            bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            bytes
        }
    }
}

/// Character cursor over the decoded text
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn line_at(&self, pos: usize) -> usize {
        self.text[..pos].matches('\n').count() + 1
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> TextGridError {
        TextGridError::Syntax {
            line: self.line_at(pos),
            message: message.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> TextGridError {
        self.error_at(self.pos, message)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos == self.text.len()
    }

    /// Matches a sequence of whitespace-separated words
    fn keyword(&mut self, expected: &str) -> Result<(), TextGridError> {
        for piece in expected.split_whitespace() {
            self.skip_whitespace();
            if !self.rest().starts_with(piece) {
                return Err(self.error(format!("expected '{}'", expected)));
            }
            self.pos += piece.len();
        }
        Ok(())
    }

    /// Reads a run of non-whitespace characters
    fn word(&mut self) -> &'a str {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn number(&mut self) -> Result<Time, TextGridError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.word();
        Time::parse(word).ok_or_else(|| self.error_at(start, format!("invalid number '{}'", word)))
    }

    fn count(&mut self) -> Result<usize, TextGridError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.word();
        word.parse()
            .map_err(|_| self.error_at(start, format!("invalid count '{}'", word)))
    }

    fn flag(&mut self) -> Result<bool, TextGridError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.word() {
            "<exists>" => Ok(true),
            "<absent>" => Ok(false),
            other => Err(self.error_at(start, format!("expected <exists> or <absent>, found '{}'", other))),
        }
    }

    /// Reads a quoted string, undoubling inner quotes
    fn string(&mut self) -> Result<String, TextGridError> {
        self.skip_whitespace();
        let start = self.pos;
        if self.peek() != Some('"') {
            return Err(self.error("expected quoted text"));
        }
        self.pos += 1;

        let mut text = String::new();
        loop {
            let rest = self.rest();
            let Some(end) = rest.find('"') else {
                return Err(self.error_at(start, "unterminated quoted text"));
            };
            text.push_str(&rest[..end]);
            self.pos += end + 1;

            if self.peek() == Some('"') {
                text.push('"');
                self.pos += 1;
            } else {
                return Ok(text);
            }
        }
    }
}

fn read_header(scanner: &mut Scanner<'_>) -> Result<(Variant, Header), TextGridError> {
    let unsupported = |what: &str| TextGridError::UnsupportedVariant(what.to_string());

    scanner
        .keyword("File type =")
        .map_err(|_| unsupported("missing 'File type' header"))?;
    let file_type = scanner
        .string()
        .map_err(|_| unsupported("unreadable 'File type' header"))?;

    match file_type.as_str() {
        "ooTextFile" => {
            scanner
                .keyword("Object class =")
                .map_err(|_| unsupported("missing 'Object class' header"))?;
            let class = scanner
                .string()
                .map_err(|_| unsupported("unreadable 'Object class' header"))?;
            if class != "TextGrid" {
                return Err(unsupported(&format!("object class \"{}\"", class)));
            }

            scanner.skip_whitespace();
            match scanner.peek() {
                Some(c) if c.is_alphabetic() => Ok((Variant::Long, Header::Standard)),
                Some(_) => Ok((Variant::Short, Header::Standard)),
                None => Err(scanner.error("missing document body")),
            }
        }
        "ooTextFile short" => {
            let class = scanner
                .string()
                .map_err(|_| unsupported("unreadable object class"))?;
            if class != "TextGrid" {
                return Err(unsupported(&format!("object class \"{}\"", class)));
            }
            Ok((Variant::Short, Header::LegacyShort))
        }
        other => Err(unsupported(&format!("file type \"{}\"", other))),
    }
}

fn write_header(out: &mut String, header: Header, newline: &str) {
    match header {
        Header::Standard => {
            out.push_str("File type = \"ooTextFile\"");
            out.push_str(newline);
            out.push_str("Object class = \"TextGrid\"");
        }
        Header::LegacyShort => {
            out.push_str("File type = \"ooTextFile short\"");
            out.push_str(newline);
            out.push_str("\"TextGrid\"");
        }
    }
    out.push_str(newline);
    out.push_str(newline);
}

/// Reads one field; `key` is the field's name in the long layout
trait FieldReader<'a> {
    fn scanner(&mut self) -> &mut Scanner<'a>;
    fn open(&mut self, header: &str) -> Result<(), TextGridError>;
    fn time(&mut self, key: &str) -> Result<Time, TextGridError>;
    fn count(&mut self, key: &str) -> Result<usize, TextGridError>;
    fn text(&mut self, key: &str) -> Result<String, TextGridError>;
    fn presence(&mut self, key: &str) -> Result<bool, TextGridError>;
}

struct LongReader<'a> {
    scanner: Scanner<'a>,
}

impl<'a> FieldReader<'a> for LongReader<'a> {
    fn scanner(&mut self) -> &mut Scanner<'a> {
        &mut self.scanner
    }

    fn open(&mut self, header: &str) -> Result<(), TextGridError> {
        self.scanner.keyword(header)
    }

    fn time(&mut self, key: &str) -> Result<Time, TextGridError> {
        self.scanner.keyword(key)?;
        self.scanner.keyword("=")?;
        self.scanner.number()
    }

    fn count(&mut self, key: &str) -> Result<usize, TextGridError> {
        self.scanner.keyword(key)?;
        self.scanner.keyword("=")?;
        self.scanner.count()
    }

    fn text(&mut self, key: &str) -> Result<String, TextGridError> {
        self.scanner.keyword(key)?;
        self.scanner.keyword("=")?;
        self.scanner.string()
    }

    fn presence(&mut self, key: &str) -> Result<bool, TextGridError> {
        self.scanner.keyword(key)?;
        self.scanner.flag()
    }
}

struct ShortReader<'a> {
    scanner: Scanner<'a>,
}

impl<'a> FieldReader<'a> for ShortReader<'a> {
    fn scanner(&mut self) -> &mut Scanner<'a> {
        &mut self.scanner
    }

    fn open(&mut self, _header: &str) -> Result<(), TextGridError> {
        Ok(())
    }

    fn time(&mut self, _key: &str) -> Result<Time, TextGridError> {
        self.scanner.number()
    }

    fn count(&mut self, _key: &str) -> Result<usize, TextGridError> {
        self.scanner.count()
    }

    fn text(&mut self, _key: &str) -> Result<String, TextGridError> {
        self.scanner.string()
    }

    fn presence(&mut self, _key: &str) -> Result<bool, TextGridError> {
        self.scanner.flag()
    }
}

fn read_document<'a, R: FieldReader<'a>>(
    reader: &mut R,
) -> Result<(Time, Time, Vec<Tier>), TextGridError> {
    let xmin = reader.time("xmin")?;
    let xmax = reader.time("xmax")?;

    let mut tiers = Vec::new();
    if reader.presence("tiers?")? {
        let size = reader.count("size")?;
        reader.open("item []:")?;
        for index in 1..=size {
            reader.open(&format!("item [{}]:", index))?;
            tiers.push(read_tier(reader)?);
        }
    }

    if !reader.scanner().at_end() {
        let scanner = reader.scanner();
        return Err(scanner.error("unexpected content after the last tier"));
    }

    Ok((xmin, xmax, tiers))
}

fn read_tier<'a, R: FieldReader<'a>>(reader: &mut R) -> Result<Tier, TextGridError> {
    reader.scanner().skip_whitespace();
    let class_pos = reader.scanner().pos;

    let class = reader.text("class")?;
    let name = reader.text("name")?;
    let xmin = reader.time("xmin")?;
    let xmax = reader.time("xmax")?;

    match class.as_str() {
        "IntervalTier" => {
            let size = reader.count("intervals: size")?;
            let mut intervals = Vec::new();
            for index in 1..=size {
                reader.open(&format!("intervals [{}]:", index))?;
                let start = reader.time("xmin")?;
                let end = reader.time("xmax")?;
                let text = reader.text("text")?;
                intervals.push(Interval { start, end, text });
            }
            Ok(Tier::Interval(IntervalTier {
                name,
                xmin,
                xmax,
                intervals,
            }))
        }
        "TextTier" => {
            let size = reader.count("points: size")?;
            let mut points = Vec::new();
            for index in 1..=size {
                reader.open(&format!("points [{}]:", index))?;
                let time = reader.time("number")?;
                let mark = reader.text("mark")?;
                points.push(Point { time, mark });
            }
            Ok(Tier::Point(PointTier {
                name,
                xmin,
                xmax,
                points,
            }))
        }
        other => Err(reader
            .scanner()
            .error_at(class_pos, format!("unknown tier class \"{}\"", other))),
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Writes one field at an indentation depth
trait FieldWriter {
    fn open(&mut self, depth: usize, header: &str);
    fn value(&mut self, depth: usize, key: &str, value: &str);
    fn presence(&mut self, depth: usize, key: &str, present: bool);
}

struct LongWriter {
    out: String,
    newline: &'static str,
}

impl LongWriter {
    fn new(newline: &'static str) -> Self {
        Self {
            out: String::new(),
            newline,
        }
    }

    fn line(&mut self, depth: usize, content: &str) {
        for _ in 0..depth {
            self.out.push_str("    ");
        }
        self.out.push_str(content);
        self.out.push_str(self.newline);
    }
}

impl FieldWriter for LongWriter {
    fn open(&mut self, depth: usize, header: &str) {
        self.line(depth, header);
    }

    fn value(&mut self, depth: usize, key: &str, value: &str) {
        self.line(depth, &format!("{} = {} ", key, value));
    }

    fn presence(&mut self, depth: usize, key: &str, present: bool) {
        let flag = if present { "<exists>" } else { "<absent>" };
        self.line(depth, &format!("{} {} ", key, flag));
    }
}

struct ShortWriter {
    out: String,
    newline: &'static str,
}

impl ShortWriter {
    fn new(newline: &'static str) -> Self {
        Self {
            out: String::new(),
            newline,
        }
    }

    fn line(&mut self, content: &str) {
        self.out.push_str(content);
        self.out.push_str(self.newline);
    }
}

impl FieldWriter for ShortWriter {
    fn open(&mut self, _depth: usize, _header: &str) {}

    fn value(&mut self, _depth: usize, _key: &str, value: &str) {
        self.line(value);
    }

    fn presence(&mut self, _depth: usize, _key: &str, present: bool) {
        self.line(if present { "<exists>" } else { "<absent>" });
    }
}

fn write_document<W: FieldWriter>(writer: &mut W, document: &TextGrid) {
    writer.value(0, "xmin", document.xmin.literal());
    writer.value(0, "xmax", document.xmax.literal());

    if document.tiers.is_empty() {
        writer.presence(0, "tiers?", false);
        return;
    }

    writer.presence(0, "tiers?", true);
    writer.value(0, "size", &document.tiers.len().to_string());
    writer.open(0, "item []: ");

    for (index, tier) in document.tiers.iter().enumerate() {
        writer.open(1, &format!("item [{}]:", index + 1));
        writer.value(2, "class", &quote(tier.class()));
        writer.value(2, "name", &quote(tier.name()));
        writer.value(2, "xmin", tier.xmin().literal());
        writer.value(2, "xmax", tier.xmax().literal());

        match tier {
            Tier::Interval(tier) => {
                writer.value(2, "intervals: size", &tier.intervals.len().to_string());
                for (i, interval) in tier.intervals.iter().enumerate() {
                    writer.open(2, &format!("intervals [{}]:", i + 1));
                    writer.value(3, "xmin", interval.start.literal());
                    writer.value(3, "xmax", interval.end.literal());
                    writer.value(3, "text", &quote(&interval.text));
                }
            }
            Tier::Point(tier) => {
                writer.value(2, "points: size", &tier.points.len().to_string());
                for (i, point) in tier.points.iter().enumerate() {
                    writer.open(2, &format!("points [{}]:", i + 1));
                    writer.value(3, "number", point.time.literal());
                    writer.value(3, "mark", &quote(&point.mark));
                }
            }
        }
    }
}
