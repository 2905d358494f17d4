use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::model::Frame;

// ---------------------------------------------------------------------------
// DataSource – which file (and which block of it) a frame came from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    /// 0-based block index; `None` for single-block files.
    pub block_index: Option<usize>,
}

impl DataSource {
    pub fn new(name: impl Into<String>, block_index: Option<usize>) -> Self {
        Self {
            name: name.into(),
            block_index,
        }
    }

    pub fn of(frame: &Frame) -> Self {
        Self::new(frame.source(), frame.block_index())
    }

    /// Label shown to users, e.g. `data.tsv (block 2)`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block_index {
            Some(idx) => write!(f, "{} (block {})", self.name, idx + 1),
            None => f.write_str(&self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Short description of a set of frames, such as `(2 blocks, 3 columns, 40 rows)`.
///
/// The column count is the number of distinct column names across frames.
pub fn summarize(frames: &[Frame]) -> String {
    let mut names: Vec<&str> = frames.iter().flat_map(Frame::column_names).collect();
    names.sort_unstable();
    names.dedup();
    let rows: usize = frames.iter().map(Frame::row_count).sum();

    if frames.len() > 1 {
        format!("({} blocks, {} columns, {rows} rows)", frames.len(), names.len())
    } else {
        format!("({} columns, {rows} rows)", names.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    #[test]
    fn labels() {
        assert_eq!(DataSource::new("a.tsv", None).label(), "a.tsv");
        assert_eq!(DataSource::new("a.tsv", Some(0)).label(), "a.tsv (block 1)");
    }

    #[test]
    fn summary_text() {
        let a = Frame::new(
            "a",
            vec![Column::new("t", 0, vec![1.0, 2.0]), Column::new("v", 1, vec![3.0, 4.0])],
        )
        .unwrap();
        let b = Frame::new("a", vec![Column::new("t", 0, vec![5.0])]).unwrap();

        assert_eq!(summarize(std::slice::from_ref(&a)), "(2 columns, 2 rows)");
        assert_eq!(summarize(&[a, b]), "(2 blocks, 2 columns, 3 rows)");
    }
}
