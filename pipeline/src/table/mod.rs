//! In-memory tables loaded from CSV files.
//!
//! A [`Table`] is an ordered list of named [`Column`]s of equal length. Each
//! column holds one [`Cell`] per row. Column types are inferred on read (see
//! [`io`]) and follow the usual dataframe rules: an integer column that gains
//! a missing value or a fractional value becomes a float column.

pub mod io;

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::error::{TableError, TableResult};

pub use io::{decode_content, detect_encoding, parse_bytes, read_csv, write_csv, write_to};

// =============================================================================
// Cell
// =============================================================================

/// A single value of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Empty field or NA marker.
    Missing,
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Anything that is not a number.
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric view of the cell, `None` for text and missing values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Missing | Cell::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell the way it is written to a CSV field.
    pub fn render(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => format_float(*v),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Total order used for class labels: numbers ascending, then text.
    pub fn total_cmp(&self, other: &Cell) -> Ordering {
        fn rank(cell: &Cell) -> u8 {
            match cell {
                Cell::Int(_) | Cell::Float(_) => 0,
                Cell::Text(_) => 1,
                Cell::Missing => 2,
            }
        }

        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => match (self, other) {
                (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
                _ => rank(self).cmp(&rank(other)),
            },
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Format a float with the shortest round-trip digits, always keeping a
/// fractional part (`22.0`, `28.5`). Very large and very small magnitudes
/// use a signed, two-digit exponent (`1e+16`, `1.5e-07`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

// =============================================================================
// Column
// =============================================================================

/// A named sequence of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    /// Promote integers to floats when the column also holds floats or
    /// missing values, so a column never mixes the two numeric kinds.
    pub fn normalize_numeric(mut self) -> Self {
        let has_text = self.cells.iter().any(|c| matches!(c, Cell::Text(_)));
        let has_int = self.cells.iter().any(|c| matches!(c, Cell::Int(_)));
        let needs_float = self
            .cells
            .iter()
            .any(|c| matches!(c, Cell::Float(_) | Cell::Missing));

        if !has_text && has_int && needs_float {
            for cell in &mut self.cells {
                if let Cell::Int(v) = *cell {
                    *cell = Cell::Float(v as f64);
                }
            }
        }
        self
    }
}

// =============================================================================
// Table
// =============================================================================

/// Ordered set of equally long named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking that every column has the same length.
    pub fn new(columns: Vec<Column>) -> TableResult<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        for column in &columns {
            if column.len() != n_rows {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: n_rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> TableResult<&Column> {
        self.position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    /// Remove every named column. Fails without touching the table if any
    /// name is absent.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> TableResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.contains(n.as_ref())) {
            return Err(TableError::ColumnNotFound(missing.as_ref().to_string()));
        }
        self.columns
            .retain(|c| !names.iter().any(|n| n.as_ref() == c.name));
        Ok(())
    }

    /// Replace the column of the same name in place, or append it.
    pub fn put_column(&mut self, column: Column) -> TableResult<()> {
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(TableError::LengthMismatch {
                actual: column.len(),
                column: column.name,
                expected: self.n_rows,
            });
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        }
        match self.position(&column.name) {
            Some(i) => self.columns[i] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }
}
