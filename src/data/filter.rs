use serde::{Deserialize, Serialize};

use super::model::Frame;
use crate::error::{AlignError, ColumnNotFound};

// ---------------------------------------------------------------------------
// Row filter: inclusive value range on one column
// ---------------------------------------------------------------------------

/// Keep rows whose value in `column` lies within `[min, max]`.
/// A missing bound means "unbounded" on that side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl RowFilter {
    pub fn new(column: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            column: column.into(),
            min,
            max,
        }
    }

    /// Whether at least one bound is set.
    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn accepts(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    /// One flag per value: true when the row is kept.
    ///
    /// NaN fails every bound, so it is only kept by an unbounded filter.
    pub fn keep_mask(&self, values: &[f64]) -> Vec<bool> {
        values.iter().map(|v| self.accepts(*v)).collect()
    }

    pub fn apply(&self, frame: &Frame) -> Result<Frame, ColumnNotFound> {
        frame.filter_rows(&self.column, self.min, self.max)
    }
}

impl Frame {
    /// A new frame holding only the rows where `min <= column <= max`.
    ///
    /// Column order, derived flags, source and block index carry over; the
    /// receiver is not modified.
    pub fn filter_rows(
        &self,
        column: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Frame, ColumnNotFound> {
        let filter = RowFilter::new(column, min, max);
        let mask = filter.keep_mask(self.values(column)?);
        let kept = mask.iter().filter(|k| **k).count();

        if kept == self.row_count() {
            return Ok(self.clone());
        }
        log::trace!(
            "filter {column} in [{min:?}, {max:?}] keeps {kept}/{} rows of {}",
            self.row_count(),
            self.source()
        );

        Ok(self.compacted(&mask, kept))
    }
}

// ---------------------------------------------------------------------------
// Alignment: shared axis range across frames
// ---------------------------------------------------------------------------

/// Frames sharing a column, plus that column's union range across all of them.
///
/// The frames are the originals; nothing is resampled.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrames {
    frames: Vec<Frame>,
    column: String,
    x_min: f64,
    x_max: f64,
}

impl AlignedFrames {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Name of the column the frames were aligned on.
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    pub fn range(&self) -> (f64, f64) {
        (self.x_min, self.x_max)
    }
}

/// Validate that every frame has a non-empty `column` and compute the union
/// range of its values.
///
/// Every frame is checked for the column before any column is checked for
/// emptiness, so a missing column is reported ahead of an empty one even when
/// the empty one comes first.
///
/// NaN values are skipped rather than propagated: a single NaN does not turn
/// the range into NaN. Only when every value is NaN are both bounds NaN.
pub fn align_frames(frames: Vec<Frame>, column: &str) -> Result<AlignedFrames, AlignError> {
    if frames.is_empty() {
        return Err(AlignError::NoFrames);
    }

    let columns = frames
        .iter()
        .enumerate()
        .map(|(index, frame)| {
            frame
                .values(column)
                .map_err(|source| AlignError::MissingColumn { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(index) = columns.iter().position(|values| values.is_empty()) {
        return Err(AlignError::EmptyColumn {
            index,
            column: column.to_string(),
            source_id: frames[index].source().to_string(),
        });
    }

    let (x_min, x_max) = columns
        .iter()
        .flat_map(|values| values.iter().copied())
        .fold((f64::NAN, f64::NAN), |(lo, hi), v| (lo.min(v), hi.max(v)));

    log::debug!(
        "aligned {} frames on '{column}': [{x_min}, {x_max}]",
        frames.len()
    );
    Ok(AlignedFrames {
        frames,
        column: column.to_string(),
        x_min,
        x_max,
    })
}
