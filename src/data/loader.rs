use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use super::blocks::{self, Block, SourceLine};
use super::model::{Column, Frame};
use crate::error::{LoadError, ParseError, ValidationError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How to read a delimited numeric file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Whether the first data line of each block holds column names.
    pub has_header: bool,
    /// Lines whose trimmed text starts with one of these are comments.
    pub comment_prefixes: Vec<String>,
    pub delimiter: char,
    /// WHATWG encoding label, e.g. `utf-8`, `latin1`, `utf-16le`.
    pub encoding: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            has_header: true,
            comment_prefixes: vec!["#".to_string()],
            delimiter: '\t',
            encoding: "utf-8".to_string(),
        }
    }
}

impl ParserConfig {
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_comment_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comment_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Reject settings the parser cannot honour.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '\n' | '\r') {
            return Err(ValidationError::new(
                "Delimiter must be a single ASCII character other than a line break",
            )
            .with_field("delimiter")
            .with_value(self.delimiter.escape_default().to_string()));
        }
        if self.comment_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::new("Comment prefixes must not be empty")
                .with_field("comment_prefixes"));
        }
        self.resolve_encoding().map(|_| ())
    }

    fn resolve_encoding(&self) -> Result<&'static Encoding, ValidationError> {
        Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            ValidationError::new("Unknown text encoding")
                .with_field("encoding")
                .with_value(self.encoding.clone())
        })
    }
}

// ---------------------------------------------------------------------------
// Results and warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// No data lines at all.
    Empty,
    /// A header line but no rows.
    HeaderOnly,
}

/// A non-fatal condition noticed while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub source_id: String,
    pub block_index: Option<usize>,
    pub kind: WarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File '{}'", self.source_id)?;
        if let Some(idx) = self.block_index {
            write!(f, " (block {})", idx + 1)?;
        }
        match self.kind {
            WarningKind::Empty => f.write_str(" is empty or contains only comments"),
            WarningKind::HeaderOnly => f.write_str(" contains only a header row with no data"),
        }
    }
}

/// Parsed data together with any warnings raised on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub data: T,
    pub warnings: Vec<ParseWarning>,
}

impl<T> Parsed<T> {
    pub fn into_inner(self) -> T {
        self.data
    }
}

// ---------------------------------------------------------------------------
// TableParser
// ---------------------------------------------------------------------------

/// Turns delimited numeric text into [`Frame`]s.
///
/// ```text
///   bytes ──decode──▶ text ──split_blocks──▶ [Block] ──parse_block──▶ [Frame]
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableParser {
    config: ParserConfig,
}

impl TableParser {
    pub fn new(config: ParserConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    // -- file entry points --

    /// Parse a file as one frame; blank and comment lines are skipped.
    pub fn parse_path(&self, path: &Path) -> Result<Parsed<Frame>, LoadError> {
        let (source_id, bytes) = read_file(path)?;
        self.parse_bytes(&bytes, &source_id)
    }

    /// Parse a file into one frame per data block.
    pub fn parse_blocks_path(&self, path: &Path) -> Result<Parsed<Vec<Frame>>, LoadError> {
        let (source_id, bytes) = read_file(path)?;
        self.parse_blocks_bytes(&bytes, &source_id)
    }

    /// Parse several files, one frame each, stopping at the first failure.
    pub fn parse_multiple<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Parsed<Vec<Frame>>, LoadError> {
        let mut out = Parsed {
            data: Vec::with_capacity(paths.len()),
            warnings: Vec::new(),
        };
        for path in paths {
            let parsed = self.parse_path(path.as_ref())?;
            out.data.push(parsed.data);
            out.warnings.extend(parsed.warnings);
        }
        Ok(out)
    }

    /// Block-mode counterpart of [`parse_multiple`](Self::parse_multiple):
    /// the frames of every file, in order.
    pub fn parse_blocks_multiple<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<Parsed<Vec<Frame>>, LoadError> {
        let mut out = Parsed {
            data: Vec::new(),
            warnings: Vec::new(),
        };
        for path in paths {
            let parsed = self.parse_blocks_path(path.as_ref())?;
            out.data.extend(parsed.data);
            out.warnings.extend(parsed.warnings);
        }
        Ok(out)
    }

    // -- in-memory entry points --

    pub fn parse_bytes(&self, bytes: &[u8], source_id: &str) -> Result<Parsed<Frame>, LoadError> {
        let text = self.decode(bytes, source_id)?;
        Ok(self.parse_str(&text, source_id)?)
    }

    pub fn parse_blocks_bytes(
        &self,
        bytes: &[u8],
        source_id: &str,
    ) -> Result<Parsed<Vec<Frame>>, LoadError> {
        let text = self.decode(bytes, source_id)?;
        Ok(self.parse_blocks_str(&text, source_id)?)
    }

    /// Read a whole stream (e.g. an uploaded file) and parse it in block mode.
    pub fn parse_blocks_reader<R: Read>(
        &self,
        mut reader: R,
        source_id: &str,
    ) -> Result<Parsed<Vec<Frame>>, LoadError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| LoadError::Io {
                path: source_id.into(),
                source,
            })?;
        self.parse_blocks_bytes(&bytes, source_id)
    }

    /// Parse decoded text as a single frame.
    pub fn parse_str(&self, text: &str, source_id: &str) -> Result<Parsed<Frame>, ParseError> {
        let block = blocks::data_lines(text, &self.config.comment_prefixes);
        let mut warnings = Vec::new();
        let frame = self.parse_block(&block, source_id, None, &mut warnings)?;
        log::debug!(
            "parsed {source_id}: {} columns, {} rows",
            frame.column_count(),
            frame.row_count()
        );
        Ok(Parsed {
            data: frame,
            warnings,
        })
    }

    /// Parse decoded text into one frame per block.
    ///
    /// The result is never empty: text without data lines yields a single
    /// empty frame and a warning. Block indices are only set when there is
    /// more than one block.
    pub fn parse_blocks_str(
        &self,
        text: &str,
        source_id: &str,
    ) -> Result<Parsed<Vec<Frame>>, ParseError> {
        let found = blocks::split_blocks(text, &self.config.comment_prefixes);
        let mut warnings = Vec::new();

        if found.is_empty() {
            warnings.push(self.warn(source_id, None, WarningKind::Empty));
            return Ok(Parsed {
                data: vec![Frame::empty(source_id)],
                warnings,
            });
        }

        let multi = found.len() > 1;
        let mut frames = Vec::with_capacity(found.len());
        for (idx, block) in found.iter().enumerate() {
            let block_index = multi.then_some(idx);
            log::trace!(
                "{source_id}: block {idx} starts at line {:?} ({} lines)",
                block.first_line(),
                block.lines.len()
            );
            let frame = self.parse_block(block, source_id, block_index, &mut warnings)?;
            frames.push(frame.with_block_index(block_index));
        }

        log::debug!("parsed {source_id}: {} block(s)", frames.len());
        Ok(Parsed {
            data: frames,
            warnings,
        })
    }

    // -- internals --

    fn decode<'b>(&self, bytes: &'b [u8], source_id: &str) -> Result<Cow<'b, str>, LoadError> {
        let encoding = self.config.resolve_encoding()?;
        let body = match Encoding::for_bom(bytes) {
            Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
            _ => bytes,
        };
        encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .ok_or_else(|| LoadError::Decode {
                source_id: source_id.to_string(),
                encoding: encoding.name(),
            })
    }

    fn warn(&self, source_id: &str, block_index: Option<usize>, kind: WarningKind) -> ParseWarning {
        let warning = ParseWarning {
            source_id: source_id.to_string(),
            block_index,
            kind,
        };
        log::debug!("{warning}");
        warning
    }

    fn parse_block(
        &self,
        block: &Block<'_>,
        source_id: &str,
        block_index: Option<usize>,
        warnings: &mut Vec<ParseWarning>,
    ) -> Result<Frame, ParseError> {
        let rows = self.split_fields(block, source_id)?;
        let mut rows = block.lines.iter().zip(rows);

        let Some((first_line, first_fields)) = rows.next() else {
            warnings.push(self.warn(source_id, block_index, WarningKind::Empty));
            return Ok(Frame::empty(source_id));
        };

        let (names, data_rows): (Vec<String>, Vec<_>) = if self.config.has_header {
            let names = self.header_names(first_line, first_fields, source_id)?;
            (names, rows.collect())
        } else {
            let names = (1..=first_fields.len())
                .map(|i| format!("Column {i}"))
                .collect();
            (names, std::iter::once((first_line, first_fields)).chain(rows).collect())
        };

        if data_rows.is_empty() {
            warnings.push(self.warn(source_id, block_index, WarningKind::HeaderOnly));
        }

        let width = names.len();
        let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(data_rows.len()); width];
        for (line, fields) in data_rows {
            if fields.len() != width {
                return Err(ParseError::new(
                    source_id,
                    line.number,
                    format!(
                        "Inconsistent column count: expected {width}, got {}",
                        fields.len()
                    ),
                )
                .with_context(line.raw, self.config.delimiter));
            }
            for (col_idx, field) in fields.iter().enumerate() {
                let value = parse_number(field).ok_or_else(|| {
                    ParseError::new(source_id, line.number, "Invalid numeric value")
                        .with_column(col_idx + 1)
                        .with_raw_value(field)
                        .with_context(line.raw, self.config.delimiter)
                })?;
                columns[col_idx].push(value);
            }
        }

        let columns = names
            .into_iter()
            .zip(columns)
            .enumerate()
            .map(|(idx, (name, values))| Column::new(name, idx, values))
            .collect();
        // Header names were checked for uniqueness and every row has `width`
        // fields, so the frame invariants hold.
        Frame::new(source_id, columns).map_err(|e| {
            ParseError::new(source_id, block.first_line().unwrap_or(1), e.message)
        })
    }

    fn header_names(
        &self,
        line: &SourceLine<'_>,
        fields: csv::StringRecord,
        source_id: &str,
    ) -> Result<Vec<String>, ParseError> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(fields.len());
        for (idx, name) in fields.iter().enumerate() {
            if !seen.insert(name) {
                return Err(ParseError::new(
                    source_id,
                    line.number,
                    format!("Duplicate column name '{name}' in header"),
                )
                .with_column(idx + 1)
                .with_raw_value(name)
                .with_context(line.raw, self.config.delimiter));
            }
            names.push(name.to_string());
        }
        Ok(names)
    }

    /// Split every line of `block` into trimmed fields, one record per line.
    fn split_fields(&self, block: &Block<'_>, source_id: &str) -> Result<Vec<csv::StringRecord>, ParseError> {
        let joined = block
            .lines
            .iter()
            .map(SourceLine::content)
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .delimiter(self.config.delimiter as u8)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_reader(joined.as_bytes());

        let mut records = Vec::with_capacity(block.lines.len());
        for (line, record) in block.lines.iter().zip(reader.records()) {
            let record = record.map_err(|e| {
                ParseError::new(source_id, line.number, format!("Malformed line: {e}"))
                    .with_context(line.raw, self.config.delimiter)
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Parse one trimmed field as a finite `f64`.
///
/// Accepts signed decimals and scientific notation; rejects `nan`/`inf`
/// spellings, overflow to infinity, and grouping separators.
pub fn parse_number(field: &str) -> Option<f64> {
    let looks_numeric = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !looks_numeric {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn read_file(path: &Path) -> Result<(String, Vec<u8>), LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    Ok((path.display().to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TableParser {
        TableParser::default()
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("1.5"), Some(1.5));
        assert_eq!(parse_number("-2"), Some(-2.0));
        assert_eq!(parse_number("+3e-2"), Some(0.03));
        assert_eq!(parse_number("1.23E+4"), Some(12300.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        for bad in ["", "NaN", "nan", "inf", "-Infinity", "1,000", "1_000", "1e999", "0x10", "abc", "1.2.3"] {
            assert_eq!(parse_number(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn config_defaults() {
        let config = ParserConfig::default();
        assert!(config.has_header);
        assert_eq!(config.comment_prefixes, vec!["#"]);
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.encoding, "utf-8");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let bad = ParserConfig::default().with_delimiter('\n');
        assert_eq!(bad.validate().unwrap_err().field.as_deref(), Some("delimiter"));
        let bad = ParserConfig::default().with_delimiter('→');
        assert!(bad.validate().is_err());
        let bad = ParserConfig::default().with_comment_prefixes([""]);
        assert!(bad.validate().is_err());
        let bad = ParserConfig::default().with_encoding("klingon");
        assert_eq!(bad.validate().unwrap_err().field.as_deref(), Some("encoding"));
        assert!(TableParser::new(ParserConfig::default().with_encoding("latin1")).is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ParserConfig = serde_json::from_str(r#"{"delimiter": ","}"#).unwrap();
        assert_eq!(config.delimiter, ',');
        assert!(config.has_header);
        assert_eq!(config.comment_prefixes, vec!["#"]);
    }

    #[test]
    fn header_and_rows() {
        let frame = parser()
            .parse_str("a\tb\n1.0\t2.0\n3.0\t4.0\n", "t.tsv")
            .unwrap()
            .into_inner();
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.column_names(), vec!["a", "b"]);
        assert_eq!(frame.values("a").unwrap(), &[1.0, 3.0]);
        assert_eq!(frame.values("b").unwrap(), &[2.0, 4.0]);
    }

    #[test]
    fn fields_are_trimmed() {
        let config = ParserConfig::default().with_delimiter(',');
        let frame = TableParser::new(config)
            .unwrap()
            .parse_str("  x , y \n 1 ,  2\n", "t.csv")
            .unwrap()
            .into_inner();
        assert_eq!(frame.column_names(), vec!["x", "y"]);
        assert_eq!(frame.values("y").unwrap(), &[2.0]);
    }

    #[test]
    fn quotes_are_not_special() {
        let err = parser()
            .parse_str("a\n\"1\"\n", "q.tsv")
            .unwrap_err();
        assert_eq!(err.raw_value.as_deref(), Some("\"1\""));
    }

    #[test]
    fn decode_latin1_and_bom() {
        let latin1 = TableParser::new(ParserConfig::default().with_encoding("latin1")).unwrap();
        let frame = latin1
            .parse_bytes(b"temp\xb0C\n1\n", "l.tsv")
            .unwrap()
            .into_inner();
        assert_eq!(frame.column_names(), vec!["temp°C"]);

        let frame = parser()
            .parse_bytes(b"\xef\xbb\xbfa\n1\n", "bom.tsv")
            .unwrap()
            .into_inner();
        assert_eq!(frame.column_names(), vec!["a"]);
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let err = parser().parse_bytes(b"a\n\xff\n", "bad.tsv").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn warning_messages() {
        let empty = ParseWarning {
            source_id: "f.tsv".into(),
            block_index: None,
            kind: WarningKind::Empty,
        };
        assert_eq!(empty.to_string(), "File 'f.tsv' is empty or contains only comments");
        let header_only = ParseWarning {
            source_id: "f.tsv".into(),
            block_index: Some(1),
            kind: WarningKind::HeaderOnly,
        };
        assert_eq!(
            header_only.to_string(),
            "File 'f.tsv' (block 2) contains only a header row with no data"
        );
    }
}
