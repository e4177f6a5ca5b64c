//! Cleaning and filtering steps. Each step reads one dataset and returns a
//! new one linked to its parent; nothing is changed in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AppError;
use crate::models::{Cell, Dataset, Row};
use crate::services::csv::utils::{clean_field, infer_cell};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    /// Keep only these columns, in the given order.
    SelectColumns { columns: Vec<String> },
    DropColumns { columns: Vec<String> },
    RenameColumns { renames: HashMap<String, String> },
    /// Remove every row with at least one missing cell.
    DropIncompleteRows,
    /// Replace missing cells of one column. `value` is typed like a parsed field.
    FillMissing { column: String, value: String },
    /// Keep rows whose cell in `column` has this text form.
    FilterEquals { column: String, value: String },
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Transform::SelectColumns { .. } => "select_columns",
            Transform::DropColumns { .. } => "drop_columns",
            Transform::RenameColumns { .. } => "rename_columns",
            Transform::DropIncompleteRows => "drop_incomplete_rows",
            Transform::FillMissing { .. } => "fill_missing",
            Transform::FilterEquals { .. } => "filter_equals",
        }
    }

    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset, AppError> {
        match self {
            Transform::SelectColumns { columns } => {
                let indices = resolve_columns(dataset, columns)?;
                Ok(project(dataset, &indices))
            }
            Transform::DropColumns { columns } => {
                resolve_columns(dataset, columns)?;
                let kept: Vec<usize> = (0..dataset.column_count())
                    .filter(|&idx| !columns.contains(&dataset.columns()[idx]))
                    .collect();
                Ok(project(dataset, &kept))
            }
            Transform::RenameColumns { renames } => {
                for from in renames.keys() {
                    require_column(dataset, from)?;
                }
                let columns = dataset
                    .columns()
                    .iter()
                    .map(|c| renames.get(c).cloned().unwrap_or_else(|| c.clone()))
                    .collect();
                Ok(dataset.derive(columns, dataset.rows().to_vec()))
            }
            Transform::DropIncompleteRows => {
                let rows = dataset
                    .rows()
                    .iter()
                    .filter(|row| !row.iter().any(Cell::is_missing))
                    .cloned()
                    .collect();
                Ok(dataset.derive(dataset.columns().to_vec(), rows))
            }
            Transform::FillMissing { column, value } => {
                let idx = require_column(dataset, column)?;
                let fill = infer_cell(&clean_field(value));
                let rows = dataset
                    .rows()
                    .iter()
                    .map(|row| {
                        let mut row = row.clone();
                        if let Some(cell) = row.get_mut(idx) {
                            if cell.is_missing() {
                                *cell = fill.clone();
                            }
                        }
                        row
                    })
                    .collect();
                Ok(dataset.derive(dataset.columns().to_vec(), rows))
            }
            Transform::FilterEquals { column, value } => {
                let idx = require_column(dataset, column)?;
                let rows = dataset
                    .rows()
                    .iter()
                    .filter(|row| row.get(idx).map(|c| c.to_string() == *value).unwrap_or(false))
                    .cloned()
                    .collect();
                Ok(dataset.derive(dataset.columns().to_vec(), rows))
            }
        }
    }
}

/// Applies `transforms` in order. The input dataset is returned untouched as
/// the first link of the chain; the result is the last derived value.
pub fn apply_all(dataset: &Dataset, transforms: &[Transform]) -> Result<Dataset, AppError> {
    let mut current = dataset.clone();
    for (idx, transform) in transforms.iter().enumerate() {
        current = transform.apply(&current).map_err(|e| match e {
            AppError::UnknownColumn(col) => AppError::InvalidInput(format!(
                "transform {} ({}) references unknown column {}",
                idx,
                transform.name(),
                col
            )),
            other => other,
        })?;
        tracing::debug!(
            "Applied {} -> dataset {} ({} rows x {} columns)",
            transform.name(),
            current.id(),
            current.row_count(),
            current.column_count()
        );
    }
    Ok(current)
}

fn require_column(dataset: &Dataset, column: &str) -> Result<usize, AppError> {
    dataset
        .column_index(column)
        .ok_or_else(|| AppError::UnknownColumn(column.to_string()))
}

fn resolve_columns(dataset: &Dataset, columns: &[String]) -> Result<Vec<usize>, AppError> {
    columns.iter().map(|c| require_column(dataset, c)).collect()
}

fn project(dataset: &Dataset, indices: &[usize]) -> Dataset {
    let columns = indices.iter().map(|&i| dataset.columns()[i].clone()).collect();
    let rows: Vec<Row> = dataset
        .rows()
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();
    dataset.derive(columns, rows)
}
