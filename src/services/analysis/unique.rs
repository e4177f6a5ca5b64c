use serde::Serialize;
use std::collections::HashMap;
use std::collections::HashSet;

use crate::models::{Cell, Dataset};

/// Distinct non-missing values of a column in first-seen order. Values are
/// compared by their text form. The result is never truncated here.
pub fn unique_values(dataset: &Dataset, column: &str) -> Option<Vec<Cell>> {
    let values = dataset.column_values(column)?;

    let mut seen = HashSet::new();
    let unique = values
        .filter(|cell| !cell.is_missing())
        .filter(|cell| seen.insert(cell.to_string()))
        .cloned()
        .collect();

    Some(unique)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: Cell,
    pub count: usize,
}

/// Occurrence counts of each distinct non-missing value, most frequent first.
/// Ties keep first-seen order.
pub fn value_counts(dataset: &Dataset, column: &str) -> Option<Vec<ValueCount>> {
    let values = dataset.column_values(column)?;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();

    for cell in values.filter(|cell| !cell.is_missing()) {
        let key = cell.to_string();
        match index.get(&key) {
            Some(&pos) => counts[pos].count += 1,
            None => {
                index.insert(key, counts.len());
                counts.push(ValueCount {
                    value: cell.clone(),
                    count: 1,
                });
            }
        }
    }

    // stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    Some(counts)
}

/// Unique count over total cells in the column; 0 for an empty column.
pub fn diversity(unique_count: usize, total_cells: usize) -> f64 {
    if total_cells == 0 {
        0.0
    } else {
        unique_count as f64 / total_cells as f64
    }
}
