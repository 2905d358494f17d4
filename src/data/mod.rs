/// Data layer: splitting, parsing, frames, filtering and alignment.
///
/// Architecture:
/// ```text
///  .tsv / .csv / .dat  (any delimiter, any supported encoding)
///        │
///        ▼
///   ┌──────────┐
///   │  blocks   │  classify lines → contiguous data blocks
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  header + rows of each block → Frame
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Frame: named f64 columns, display order, derived columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  value-range row filters, multi-frame alignment
///   └──────────┘
/// ```

pub mod blocks;
pub mod filter;
pub mod loader;
pub mod model;
