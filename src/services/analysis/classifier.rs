use serde::{Deserialize, Serialize};

use crate::models::{Cell, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Sample-based column typing.
///
/// Looks at the first `sample_size` rows of a column and calls it numeric
/// when the share of cells that are numbers or missing is strictly above
/// `numeric_threshold`. Missing cells never count against numeric, so a
/// column with only nulls is numeric. A column with no rows is categorical.
/// Rows past the sample window are never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationPolicy {
    sample_size: usize,
    numeric_threshold: f64,
}

impl ClassificationPolicy {
    pub const STANDALONE_SAMPLE_SIZE: usize = 20;
    pub const ROLLUP_SAMPLE_SIZE: usize = 10;
    pub const DEFAULT_THRESHOLD: f64 = 0.7;

    pub fn new(sample_size: usize, numeric_threshold: f64) -> Self {
        Self {
            sample_size: sample_size.max(1),
            numeric_threshold,
        }
    }

    /// Depth used when a single column is classified on request.
    pub fn standalone() -> Self {
        Self::new(Self::STANDALONE_SAMPLE_SIZE, Self::DEFAULT_THRESHOLD)
    }

    /// Depth used by the whole-dataset dashboard rollup.
    pub fn rollup() -> Self {
        Self::new(Self::ROLLUP_SAMPLE_SIZE, Self::DEFAULT_THRESHOLD)
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn numeric_threshold(&self) -> f64 {
        self.numeric_threshold
    }

    pub fn classify_values<'a, I>(&self, values: I) -> ColumnKind
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let (sampled, compatible) = values
            .into_iter()
            .take(self.sample_size)
            .fold((0usize, 0usize), |(sampled, compatible), cell| {
                let ok = cell.is_missing() || matches!(cell, Cell::Number(_));
                (sampled + 1, compatible + usize::from(ok))
            });

        if sampled == 0 {
            return ColumnKind::Categorical;
        }

        if compatible as f64 / sampled as f64 > self.numeric_threshold {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    /// Classifies the column at position `idx`.
    pub fn classify_at(&self, dataset: &Dataset, idx: usize) -> ColumnKind {
        self.classify_values(dataset.rows().iter().filter_map(|row| row.get(idx)))
    }

    /// Classifies a column by name; `None` if the dataset has no such column.
    pub fn classify(&self, dataset: &Dataset, column: &str) -> Option<ColumnKind> {
        dataset
            .column_index(column)
            .map(|idx| self.classify_at(dataset, idx))
    }
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self::standalone()
    }
}
