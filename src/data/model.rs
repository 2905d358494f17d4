use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{ColumnNotFound, ExpressionError, ExpressionErrorKind, ValidationError};
use crate::expr::Expression;

// ---------------------------------------------------------------------------
// Column – one named numeric series
// ---------------------------------------------------------------------------

/// A named column of `f64` values.
///
/// Values live behind an `Arc`, so cloning a column (or a whole [`Frame`])
/// shares storage; operations that change values always build new storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    /// 0-based position in the source file, or append order for derived columns.
    index: usize,
    values: Arc<[f64]>,
    derived: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, index: usize, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            index,
            values: values.into(),
            derived: false,
        }
    }

    pub(crate) fn derived(name: impl Into<String>, index: usize, values: Vec<f64>) -> Self {
        Self {
            derived: true,
            ..Self::new(name, index, values)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Whether this column was computed from an expression.
    pub fn is_derived(&self) -> bool {
        self.derived
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of this column holding only the rows where `mask` is true.
    pub(crate) fn compact(&self, mask: &[bool]) -> Self {
        let values: Vec<f64> = self
            .values
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(v, _)| *v)
            .collect();
        Self {
            name: self.name.clone(),
            index: self.index,
            values: values.into(),
            derived: self.derived,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame – equal-length named columns plus provenance
// ---------------------------------------------------------------------------

/// An in-memory table of equal-length numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: BTreeMap<String, Column>,
    /// Display order; always a permutation of `columns`' keys.
    order: Vec<String>,
    source: String,
    row_count: usize,
    block_index: Option<usize>,
}

impl Frame {
    /// Build a frame from columns given in display order.
    pub fn new(source: impl Into<String>, columns: Vec<Column>) -> Result<Self, ValidationError> {
        let source = source.into();
        let row_count = columns.first().map_or(0, Column::len);

        let mut map = BTreeMap::new();
        let mut order = Vec::with_capacity(columns.len());
        for column in columns {
            if column.len() != row_count {
                return Err(ValidationError::new(format!(
                    "Column '{}' has {} values but the frame has {row_count} rows",
                    column.name,
                    column.len()
                ))
                .with_field(column.name.clone())
                .with_value(column.len().to_string()));
            }
            if map.contains_key(&column.name) {
                return Err(ValidationError::new("Duplicate column name")
                    .with_field("name")
                    .with_value(column.name.clone()));
            }
            order.push(column.name.clone());
            map.insert(column.name.clone(), column);
        }

        Ok(Self {
            columns: map,
            order,
            source,
            row_count,
            block_index: None,
        })
    }

    /// A frame with no columns and no rows.
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            columns: BTreeMap::new(),
            order: Vec::new(),
            source: source.into(),
            row_count: 0,
            block_index: None,
        }
    }

    pub(crate) fn with_block_index(mut self, block_index: Option<usize>) -> Self {
        self.block_index = block_index;
        self
    }

    /// Identifier of the file or stream this frame came from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Position of this frame among the blocks of a multi-block file.
    pub fn block_index(&self) -> Option<usize> {
        self.block_index
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Whether the frame has no data rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_count(&self) -> usize {
        self.order.len()
    }

    /// Column names in display order.
    pub fn column_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Look up a column, reporting the available names on failure.
    pub fn column(&self, name: &str) -> Result<&Column, ColumnNotFound> {
        self.columns.get(name).ok_or_else(|| self.not_found(name))
    }

    /// Shorthand for `column(name)?.values()`.
    pub fn values(&self, name: &str) -> Result<&[f64], ColumnNotFound> {
        self.column(name).map(Column::values)
    }

    /// Columns in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> + '_ {
        self.order.iter().filter_map(|name| self.columns.get(name))
    }

    /// Same frame restricted to the rows where `mask` is true.
    pub(crate) fn compacted(&self, mask: &[bool], kept: usize) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|(name, column)| (name.clone(), column.compact(mask)))
            .collect();
        Frame {
            columns,
            order: self.order.clone(),
            source: self.source.clone(),
            row_count: kept,
            block_index: self.block_index,
        }
    }

    pub(crate) fn not_found(&self, name: &str) -> ColumnNotFound {
        ColumnNotFound {
            name: name.to_string(),
            source_id: self.source.clone(),
            available: self.order.clone(),
        }
    }

    /// Evaluate `expression` over this frame's columns and append the result
    /// as a derived column named `name`.
    ///
    /// On any failure the frame is left untouched.
    pub fn add_derived_column(&mut self, name: &str, expression: &str) -> Result<(), ExpressionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExpressionError::new(
                ExpressionErrorKind::InvalidTarget,
                expression,
                "Derived column name must not be empty",
            ));
        }
        if self.contains(name) {
            return Err(ExpressionError::new(
                ExpressionErrorKind::InvalidTarget,
                expression,
                format!("Column '{name}' already exists"),
            ));
        }

        let values = Expression::compile(expression)?.evaluate(&*self)?;
        log::debug!(
            "derived column '{name}' = {expression} ({} rows) in {}",
            values.len(),
            self.source
        );

        let column = Column::derived(name, self.order.len(), values);
        self.order.push(column.name.clone());
        self.columns.insert(column.name.clone(), column);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Frame {
    type Item = &'a Column;
    type IntoIter = Box<dyn Iterator<Item = &'a Column> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

// ---------------------------------------------------------------------------
// ColumnLookup – name → array mapping consumed by the expression evaluator
// ---------------------------------------------------------------------------

/// Read-only access to named numeric arrays.
pub trait ColumnLookup {
    fn lookup(&self, name: &str) -> Option<&[f64]>;

    /// Known names, in a stable order, for diagnostics.
    fn names(&self) -> Vec<String>;

    /// Length scalars broadcast to when an expression references no column.
    fn row_count(&self) -> usize;
}

impl ColumnLookup for Frame {
    fn lookup(&self, name: &str) -> Option<&[f64]> {
        self.get(name).map(Column::values)
    }

    fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn row_count(&self) -> usize {
        self.row_count
    }
}

impl ColumnLookup for BTreeMap<String, Vec<f64>> {
    fn lookup(&self, name: &str) -> Option<&[f64]> {
        self.get(name).map(Vec::as_slice)
    }

    fn names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn row_count(&self) -> usize {
        self.values().next().map_or(0, Vec::len)
    }
}

impl ColumnLookup for HashMap<String, Vec<f64>> {
    fn lookup(&self, name: &str) -> Option<&[f64]> {
        self.get(name).map(Vec::as_slice)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys().cloned().collect();
        names.sort();
        names
    }

    fn row_count(&self) -> usize {
        self.values().next().map_or(0, Vec::len)
    }
}
