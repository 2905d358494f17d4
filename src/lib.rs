//! Ingestion and safe computation core for file-to-chart tools.
//!
//! Delimited numeric text becomes [`Frame`]s (one per data block), frames can
//! gain columns derived from restricted arithmetic expressions, be filtered
//! by value range, and be aligned on a shared column for consistent axis
//! scaling. Malformed input is reported with file, line, column and the
//! offending text.
//!
//! ```no_run
//! use plotframe::{ParserConfig, TableParser};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let parser = TableParser::new(ParserConfig::default())?;
//! let parsed = parser.parse_blocks_path("spectrum.tsv".as_ref())?;
//! for warning in &parsed.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! let mut frame = parsed.data.into_iter().next().unwrap();
//! frame.add_derived_column("log_energy", "log(\"Energy eV\")")?;
//! let window = frame.filter_rows("k_point", Some(0.0), Some(1.0))?;
//! println!("{} rows", window.row_count());
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod expr;
pub mod pipeline;
pub mod source;
pub mod transform;

pub use data::filter::{align_frames, AlignedFrames, RowFilter};
pub use data::loader::{ParseWarning, Parsed, ParserConfig, TableParser, WarningKind};
pub use data::model::{Column, ColumnLookup, Frame};
pub use error::{
    AlignError, ColumnNotFound, ExpressionError, ExpressionErrorKind, LoadError, ParseError,
    ValidationError,
};
pub use expr::{evaluate_expression, validate_expression, Expression};
pub use pipeline::{Plan, PlanError, PlanOutput};
pub use source::{summarize, DataSource};
pub use transform::Transform;
