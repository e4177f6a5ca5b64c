use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::Dataset;
use super::classifier::{ClassificationPolicy, ColumnKind};

/// Whole-dataset rollup shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_rows: usize,
    pub total_columns: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
    pub missing_values: usize,
    /// Share of non-missing cells; 1.0 when there are no cells.
    pub completeness: f64,
}

/// Full scan over every cell.
pub fn count_missing(dataset: &Dataset) -> usize {
    dataset
        .rows()
        .par_iter()
        .fold(
            || 0usize,
            |acc, row| acc + row.iter().filter(|cell| cell.is_missing()).count(),
        )
        .reduce(|| 0, |a, b| a + b)
}

pub fn completeness(missing: usize, total_cells: usize) -> f64 {
    if total_cells == 0 {
        1.0
    } else {
        1.0 - missing as f64 / total_cells as f64
    }
}

/// Recomputes the rollup from scratch. Every column position is classified
/// with `policy`; see [`super::MetricsCache`] for the memoized path.
pub fn compute_dashboard_metrics(dataset: &Dataset, policy: &ClassificationPolicy) -> DashboardMetrics {
    let start = std::time::Instant::now();

    let numeric_columns = (0..dataset.column_count())
        .filter(|&idx| policy.classify_at(dataset, idx) == ColumnKind::Numeric)
        .count();
    let missing_values = count_missing(dataset);

    let metrics = DashboardMetrics {
        total_rows: dataset.row_count(),
        total_columns: dataset.column_count(),
        numeric_columns,
        categorical_columns: dataset.column_count() - numeric_columns,
        missing_values,
        completeness: completeness(missing_values, dataset.cell_count()),
    };

    tracing::debug!(
        "Computed metrics for dataset {} in {:?}: {:?}",
        dataset.id(),
        start.elapsed(),
        metrics
    );
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, ParseDiagnostics, Row};
    use crate::services::csv::parse_csv;
    use std::time::{Duration, Instant};

    #[test]
    fn numeric_table() {
        let ds = parse_csv("a,b\n1,2\n3,4\n", "nums");
        let m = compute_dashboard_metrics(&ds, &ClassificationPolicy::rollup());
        assert_eq!(m.total_rows, 2);
        assert_eq!(m.total_columns, 2);
        assert_eq!(m.numeric_columns, 2);
        assert_eq!(m.categorical_columns, 0);
        assert_eq!(m.missing_values, 0);
        assert_eq!(m.completeness, 1.0);
    }

    #[test]
    fn one_missing_age() {
        let ds = parse_csv("name,age\nAlice,30\nBob,\n", "people");
        let m = compute_dashboard_metrics(&ds, &ClassificationPolicy::rollup());
        assert_eq!(m.missing_values, 1);
        assert_eq!(m.numeric_columns, 1);
        assert_eq!(m.categorical_columns, 1);
        assert_eq!(m.completeness, 0.75);
    }

    #[test]
    fn empty_dataset() {
        let ds = parse_csv("", "empty");
        let m = compute_dashboard_metrics(&ds, &ClassificationPolicy::rollup());
        assert_eq!(m.total_rows, 0);
        assert_eq!(m.total_columns, 0);
        assert_eq!(m.missing_values, 0);
        assert_eq!(m.completeness, 1.0);
    }

    #[test]
    fn missing_count_ignores_row_order() {
        let ds = parse_csv("a,b,c\n1,,x\n,,\n3,4,NA\n5,6,y\n", "shuffle");
        let mut rows: Vec<Row> = ds.rows().to_vec();
        rows.reverse();
        rows.swap(0, 2);
        let shuffled = ds.derive(ds.columns().to_vec(), rows);

        assert_eq!(count_missing(&ds), 5);
        assert_eq!(count_missing(&ds), count_missing(&shuffled));
        assert_eq!(count_missing(&ds), count_missing(&ds));
    }

    #[test]
    fn large_dataset_counts_seeded_nulls_quickly() {
        const ROWS: usize = 10_000;
        const COLS: usize = 20;

        let columns: Vec<String> = (0..COLS).map(|c| format!("c{c}")).collect();
        let mut seeded = 0;
        let rows: Vec<Row> = (0..ROWS)
            .map(|r| {
                (0..COLS)
                    .map(|c| {
                        if (r * 31 + c * 7) % 97 == 0 {
                            seeded += 1;
                            Cell::Null
                        } else {
                            Cell::Number((r * COLS + c) as f64)
                        }
                    })
                    .collect()
            })
            .collect();
        let ds = Dataset::new("big", columns, rows, 0, ParseDiagnostics::default());

        let start = Instant::now();
        let m = compute_dashboard_metrics(&ds, &ClassificationPolicy::rollup());
        let elapsed = start.elapsed();

        assert!(seeded > 0);
        assert_eq!(m.missing_values, seeded);
        assert_eq!(m.numeric_columns, COLS);
        assert_eq!(m.total_rows, ROWS);
        assert!(elapsed < Duration::from_secs(2), "metrics took {elapsed:?}");
    }
}
