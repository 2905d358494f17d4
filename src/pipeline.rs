use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::filter::{align_frames, RowFilter};
use crate::data::model::Frame;
use crate::error::{AlignError, ColumnNotFound, ExpressionError};
use crate::source::DataSource;

// ---------------------------------------------------------------------------
// Plan – the derive → filter → align steps applied before rendering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Alignment {
    pub enabled: bool,
    pub column: String,
}

/// Everything a renderer needs done to freshly parsed frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub derived_columns: Vec<DerivedColumn>,
    pub filters: Vec<RowFilter>,
    pub alignment: Alignment,
}

/// A derived column that could not be added to one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDerivation {
    pub source: DataSource,
    pub column: String,
    pub error: ExpressionError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlanOutput {
    pub frames: Vec<Frame>,
    /// Union range of the alignment column, when alignment ran.
    pub x_range: Option<(f64, f64)>,
    pub skipped: Vec<SkippedDerivation>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("filter failed: {0}")]
    Filter(#[from] ColumnNotFound),

    #[error("alignment failed: {0}")]
    Align(#[from] AlignError),
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.derived_columns.is_empty() && self.filters.is_empty() && !self.alignment.enabled
    }

    /// Apply the plan to `frames`.
    ///
    /// A derived column that fails for a frame is recorded in
    /// [`PlanOutput::skipped`] and the frame is kept without it. Filters and
    /// alignment failures abort the whole plan.
    pub fn apply(&self, mut frames: Vec<Frame>) -> Result<PlanOutput, PlanError> {
        let mut skipped = Vec::new();

        for derived in &self.derived_columns {
            if derived.name.trim().is_empty() || derived.expression.trim().is_empty() {
                continue;
            }
            for frame in &mut frames {
                if let Err(error) = frame.add_derived_column(&derived.name, &derived.expression) {
                    log::warn!(
                        "could not create derived column '{}' for {}: {}",
                        derived.name,
                        DataSource::of(frame),
                        error.message
                    );
                    skipped.push(SkippedDerivation {
                        source: DataSource::of(frame),
                        column: derived.name.clone(),
                        error,
                    });
                }
            }
        }

        for filter in self.filters.iter().filter(|f| f.is_active() && !f.column.is_empty()) {
            frames = frames
                .iter()
                .map(|frame| filter.apply(frame))
                .collect::<Result<_, _>>()?;
        }

        let mut x_range = None;
        if self.alignment.enabled && !self.alignment.column.is_empty() && frames.len() > 1 {
            let aligned = align_frames(frames, &self.alignment.column)?;
            x_range = Some(aligned.range());
            frames = aligned.into_frames();
        }

        Ok(PlanOutput {
            frames,
            x_range,
            skipped,
        })
    }
}
