//! Column metadata and the row-data seam to the presentation layer.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::sort::Collation;

/// Index of a column in the table definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub usize);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One column of a table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Display name
    pub name: String,
    /// How values in this column compare
    #[serde(default)]
    pub collation: Collation,
    /// Values change on every sample (value, time, alarm state, station)
    #[serde(default)]
    pub volatile: bool,
}

impl ColumnSpec {
    /// Character column
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collation: Collation::Character,
            volatile: false,
        }
    }

    /// Numeric column
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collation: Collation::Numeric,
            volatile: false,
        }
    }

    /// Mark as volatile
    pub fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }
}

/// Ordered column definitions for a view
#[derive(Debug, Default)]
pub struct TableSchema {
    columns: Vec<ColumnSpec>,
    volatile: OnceLock<BTreeSet<ColumnId>>,
}

impl Clone for TableSchema {
    fn clone(&self) -> Self {
        Self::new(self.columns.clone())
    }
}

impl TableSchema {
    /// Schema from columns in display-definition order
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            volatile: OnceLock::new(),
        }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether there are no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column by id
    pub fn column(&self, id: ColumnId) -> Option<&ColumnSpec> {
        self.columns.get(id.0)
    }

    /// Column id by name (case-insensitive)
    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(ColumnId)
    }

    /// All column ids
    pub fn ids(&self) -> impl Iterator<Item = ColumnId> + '_ {
        (0..self.columns.len()).map(ColumnId)
    }

    /// All columns
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Volatile column ids, derived once from the column metadata
    pub fn volatile_columns(&self) -> &BTreeSet<ColumnId> {
        self.volatile.get_or_init(|| {
            self.columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.volatile)
                .map(|(i, _)| ColumnId(i))
                .collect()
        })
    }

    /// Whether `id` is volatile
    pub fn is_volatile(&self, id: ColumnId) -> bool {
        self.volatile_columns().contains(&id)
    }

    /// Collation declared for `id` (character if unknown)
    pub fn collation(&self, id: ColumnId) -> Collation {
        self.column(id).map(|c| c.collation).unwrap_or_default()
    }
}

/// Display data the presentation layer attaches to a row
///
/// The engine only reads cell text: it never renders or interprets it
/// beyond sort-key extraction.
pub trait RowData {
    /// Text of `column`, `None` if the row has no value there
    fn cell(&self, column: ColumnId) -> Option<String>;
}

/// Plain row of optional cell strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellRow(pub Vec<Option<String>>);

impl CellRow {
    /// Row from cell strings
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CellRow(cells.into_iter().map(|c| Some(c.into())).collect())
    }

    /// Columns whose text differs between two rows
    pub fn changed_columns(&self, other: &CellRow) -> Vec<ColumnId> {
        let width = self.0.len().max(other.0.len());
        (0..width)
            .filter(|&i| self.0.get(i).cloned().flatten() != other.0.get(i).cloned().flatten())
            .map(ColumnId)
            .collect()
    }
}

impl RowData for CellRow {
    fn cell(&self, column: ColumnId) -> Option<String> {
        self.0.get(column.0).cloned().flatten()
    }
}
