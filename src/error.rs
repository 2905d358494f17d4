use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// ParseError – malformed input text
// ---------------------------------------------------------------------------

/// A structural or numeric failure while splitting or parsing a data file.
///
/// Carries everything needed to render a pointer diagnostic:
///
/// ```text
/// ParseError: Invalid numeric value
///   File: data.tsv
///   Line 3, Column 2: got 'N/A'
///   Context: "1.5	N/A	4.1"
///                  ^^^
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ParseError {
    /// Source identifier (file path or caller-supplied stream name).
    pub source_id: String,
    /// 1-based physical line number.
    pub line: usize,
    /// 1-based field position, when the failure concerns one field.
    pub column: Option<usize>,
    pub message: String,
    /// The offending literal text, trimmed.
    pub raw_value: Option<String>,
    /// The full physical line, without its terminator.
    pub context_line: Option<String>,
    delimiter: char,
}

impl ParseError {
    pub fn new(source_id: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            line,
            column: None,
            message: message.into(),
            raw_value: None,
            context_line: None,
            delimiter: '\t',
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_raw_value(mut self, raw: impl Into<String>) -> Self {
        self.raw_value = Some(raw.into());
        self
    }

    /// Attach the raw line and the delimiter used to split it, so the pointer
    /// can be placed under the offending field.
    pub fn with_context(mut self, line: impl Into<String>, delimiter: char) -> Self {
        self.context_line = Some(line.into());
        self.delimiter = delimiter;
        self
    }

    /// Character offset of the offending value inside `context_line`.
    fn pointer_offset(&self) -> usize {
        let (Some(context), Some(column)) = (&self.context_line, self.column) else {
            return 0;
        };
        let mut offset = context.chars().count() - context.trim_start().chars().count();
        for (idx, field) in context.trim_start().split(self.delimiter).enumerate() {
            if idx + 1 == column {
                return offset + (field.chars().count() - field.trim_start().chars().count());
            }
            offset += field.chars().count() + 1;
        }
        0
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ParseError: {}", self.message)?;
        write!(f, "  File: {}", self.source_id)?;

        write!(f, "\n  Line {}", self.line)?;
        if let Some(column) = self.column {
            write!(f, ", Column {column}")?;
        }
        if let Some(raw) = &self.raw_value {
            write!(f, ": got '{raw}'")?;
        }

        if let Some(context) = &self.context_line {
            write!(f, "\n  Context: \"{context}\"")?;
            if self.column.is_some() {
                const PREFIX: &str = "  Context: \"";
                let width = self
                    .raw_value
                    .as_ref()
                    .map(|r| r.chars().count())
                    .filter(|w| *w > 0)
                    .unwrap_or(1);
                let pad = " ".repeat(PREFIX.len() + self.pointer_offset());
                write!(f, "\n{pad}{}", "^".repeat(width))?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExpressionError – rejected or failing derived-column expression
// ---------------------------------------------------------------------------

/// What went wrong with an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionErrorKind {
    /// The text does not parse.
    Syntax,
    /// The text parses but uses a construct outside the allow-list.
    Disallowed,
    /// A referenced column does not exist.
    UnknownColumn,
    /// Referenced arrays disagree on length.
    LengthMismatch,
    /// The result contains NaN.
    NotANumber,
    /// The result contains ±infinity.
    Infinite,
    /// The target column name is unusable (e.g. already taken).
    InvalidTarget,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub struct ExpressionError {
    pub kind: ExpressionErrorKind,
    pub message: String,
    pub expression: String,
    pub detail: Option<String>,
}

impl ExpressionError {
    pub fn new(
        kind: ExpressionErrorKind,
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            expression: expression.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExpressionError: {}", self.message)?;
        write!(f, "\n  Expression: {}", self.expression)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  Detail: {detail}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ValidationError – invariant violated outside parsing/evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationError {
    pub message: String,
    pub field: Option<String>,
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
            value: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidationError: {}", self.message)?;
        if let Some(field) = &self.field {
            write!(f, "\n  Field: {field}")?;
        }
        if let Some(value) = &self.value {
            write!(f, "\n  Value: '{value}'")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lookup and alignment failures
// ---------------------------------------------------------------------------

/// A column lookup by name failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Column '{name}' not found in {source_id}. Available columns: {}", quote_list(.available))]
pub struct ColumnNotFound {
    pub name: String,
    pub source_id: String,
    pub available: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("cannot align an empty list of frames")]
    NoFrames,

    #[error("frame {index}: {source}")]
    MissingColumn {
        index: usize,
        #[source]
        source: ColumnNotFound,
    },

    #[error("frame {index} ({source_id}): column '{column}' has no values to align")]
    EmptyColumn {
        index: usize,
        column: String,
        source_id: String,
    },
}

// ---------------------------------------------------------------------------
// LoadError – everything that can go wrong turning a path into frames
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("reading {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_id} is not valid {encoding} text")]
    Decode {
        source_id: String,
        encoding: &'static str,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound(_))
    }
}

pub(crate) fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_basic_message() {
        let err = ParseError::new("data.tsv", 42, "Invalid numeric value");
        let text = err.to_string();
        assert!(text.contains("ParseError: Invalid numeric value"));
        assert!(text.contains("File: data.tsv"));
        assert!(text.contains("Line 42"));
    }

    #[test]
    fn parse_error_column_and_value() {
        let err = ParseError::new("data.tsv", 5, "Invalid value")
            .with_column(2)
            .with_raw_value("N/A");
        assert!(err.to_string().contains("Line 5, Column 2: got 'N/A'"));
    }

    #[test]
    fn parse_error_pointer_sits_under_value() {
        let err = ParseError::new("data.tsv", 42, "Expected numeric value")
            .with_column(3)
            .with_raw_value("N/A")
            .with_context("1.5\t2.3\tN/A\t4.1", '\t');
        let text = err.to_string();
        assert!(text.contains("Context: \"1.5\t2.3\tN/A\t4.1\""));

        let pointer = text.lines().last().unwrap();
        let context = text.lines().find(|l| l.contains("Context")).unwrap();
        let col = pointer.find('^').unwrap();
        assert_eq!(&context[col..col + 3], "N/A");
        assert!(pointer.ends_with("^^^"));
    }

    #[test]
    fn parse_error_pointer_skips_padding() {
        let err = ParseError::new("data.csv", 1, "Invalid numeric value")
            .with_column(2)
            .with_raw_value("x")
            .with_context("1,  x", ',');
        let text = err.to_string();
        let pointer = text.lines().last().unwrap();
        let context = text.lines().find(|l| l.contains("Context")).unwrap();
        let col = pointer.find('^').unwrap();
        assert_eq!(&context[col..col + 1], "x");
    }

    #[test]
    fn validation_error_fields() {
        let err = ValidationError::new("Value out of range")
            .with_field("data")
            .with_value("contains zero");
        let text = err.to_string();
        assert!(text.contains("ValidationError: Value out of range"));
        assert!(text.contains("Field: data"));
        assert!(text.contains("Value: 'contains zero'"));
    }

    #[test]
    fn column_not_found_lists_available() {
        let err = ColumnNotFound {
            name: "z".into(),
            source_id: "a.tsv".into(),
            available: vec!["x".into(), "y".into()],
        };
        assert_eq!(
            err.to_string(),
            "Column 'z' not found in a.tsv. Available columns: 'x', 'y'"
        );
    }
}
