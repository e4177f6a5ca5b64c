use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DATASET_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a dataset value. Assigned once at creation and never reused
/// within a process, so it can key memo tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(u64);

impl DatasetId {
    fn next() -> Self {
        Self(NEXT_DATASET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single parsed value. Serializes as JSON `null`, a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Null, or text that is empty.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

pub type Row = Vec<Cell>;

/// Structural oddities the permissive parser tolerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostics {
    /// Lines with fewer fields than headers; trailing cells were filled with null.
    pub short_rows: usize,
    /// Lines with more fields than headers; extra fields were dropped.
    pub long_rows: usize,
}

impl ParseDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.short_rows == 0 && self.long_rows == 0
    }
}

/// In-memory tabular value produced from one uploaded file.
///
/// Never mutated after construction: cleaning produces a new `Dataset`
/// through [`Dataset::derive`], so the upload stays available for comparison.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: DatasetId,
    name: String,
    columns: Vec<String>,
    data: Vec<Row>,
    file_size: usize,
    uploaded_at: DateTime<Utc>,
    derived_from: Option<DatasetId>,
    diagnostics: ParseDiagnostics,
}

impl Dataset {
    /// Builds a dataset, padding or truncating rows so each one holds exactly
    /// one cell per column.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        data: Vec<Row>,
        file_size: usize,
        diagnostics: ParseDiagnostics,
    ) -> Self {
        let width = columns.len();
        let data = data.into_iter().map(|row| fit_row(row, width)).collect();

        Self {
            id: DatasetId::next(),
            name: name.into(),
            columns,
            data,
            file_size,
            uploaded_at: Utc::now(),
            derived_from: None,
            diagnostics,
        }
    }

    /// New dataset with the given shape that keeps this one's provenance.
    pub fn derive(&self, columns: Vec<String>, data: Vec<Row>) -> Self {
        let width = columns.len();
        let data = data.into_iter().map(|row| fit_row(row, width)).collect();

        Self {
            id: DatasetId::next(),
            name: self.name.clone(),
            columns,
            data,
            file_size: self.file_size,
            uploaded_at: self.uploaded_at,
            derived_from: Some(self.id),
            diagnostics: self.diagnostics,
        }
    }

    pub fn id(&self) -> DatasetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.data
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn file_size(&self) -> usize {
        self.file_size
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    pub fn derived_from(&self) -> Option<DatasetId> {
        self.derived_from
    }

    pub fn diagnostics(&self) -> ParseDiagnostics {
        self.diagnostics
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.column_count()
    }

    /// Position of a column. A duplicated header resolves to its last
    /// occurrence, the same cell the row-object view exposes.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().rposition(|c| c == name)
    }

    /// Cells of one column in row order.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Cell> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.data.iter().filter_map(move |row| row.get(idx)))
    }

    /// Column positions a row object exposes, in column order. A duplicated
    /// header keeps only its last position.
    pub fn visible_columns(&self) -> Vec<usize> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        let mut visible: Vec<usize> = (0..self.columns.len())
            .rev()
            .filter(|&i| seen.insert(self.columns[i].as_str()))
            .collect();
        visible.reverse();
        visible
    }

    /// Row `idx` as a name-keyed object over `visible` (see `visible_columns`).
    pub fn row_object<'a>(&'a self, idx: usize, visible: &'a [usize]) -> Option<RowObject<'a>> {
        self.data.get(idx).map(|row| RowObject {
            columns: &self.columns,
            visible,
            row,
        })
    }

    pub fn row_objects<'a>(&'a self, visible: &'a [usize]) -> impl Iterator<Item = RowObject<'a>> + 'a {
        self.data.iter().map(move |row| RowObject {
            columns: &self.columns,
            visible,
            row,
        })
    }
}

fn fit_row(mut row: Row, width: usize) -> Row {
    row.resize(width, Cell::Null);
    row
}

/// Borrowed view of a row that serializes as `{column: value, ...}` in column
/// order. Earlier duplicates of a header are shadowed by the last one.
#[derive(Debug, Clone, Copy)]
pub struct RowObject<'a> {
    columns: &'a [String],
    visible: &'a [usize],
    row: &'a [Cell],
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.visible.len()))?;
        for &idx in self.visible {
            map.serialize_entry(&self.columns[idx], &self.row[idx])?;
        }
        map.end()
    }
}
