use serde::Serialize;
use smallvec::SmallVec;

use crate::models::{Cell, Dataset};
use super::classifier::{ClassificationPolicy, ColumnKind};
use super::unique::diversity;
use std::collections::HashSet;

pub const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
    pub unique_count: usize,
    pub diversity: f64,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    /// Present for numeric columns that hold at least one number.
    pub numeric: Option<NumericSummary>,
}

/// Profiles every column position of the dataset.
pub fn profile_columns(dataset: &Dataset, policy: &ClassificationPolicy) -> Vec<ColumnProfile> {
    dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| profile_column_at(dataset, idx, name, policy))
        .collect()
}

fn profile_column_at(
    dataset: &Dataset,
    idx: usize,
    name: &str,
    policy: &ClassificationPolicy,
) -> ColumnProfile {
    let values = || dataset.rows().iter().filter_map(move |row| row.get(idx));
    let kind = policy.classify_at(dataset, idx);

    let mut missing = 0;
    let mut seen = HashSet::new();
    let mut sample_values = SmallVec::<[String; SAMPLE_SIZE]>::new();
    let mut stats: Option<(f64, f64, f64, usize)> = None;

    for cell in values() {
        if cell.is_missing() {
            missing += 1;
            continue;
        }
        let text = cell.to_string();
        if sample_values.len() < SAMPLE_SIZE && !sample_values.contains(&text) {
            sample_values.push(text.clone());
        }
        seen.insert(text);

        if let Cell::Number(n) = cell {
            stats = Some(match stats {
                None => (*n, *n, *n, 1),
                Some((min, max, sum, count)) => (min.min(*n), max.max(*n), sum + n, count + 1),
            });
        }
    }

    let numeric = match (kind, stats) {
        (ColumnKind::Numeric, Some((min, max, sum, count))) => Some(NumericSummary {
            min,
            max,
            mean: sum / count as f64,
        }),
        _ => None,
    };

    ColumnProfile {
        name: name.to_string(),
        kind,
        missing,
        unique_count: seen.len(),
        diversity: diversity(seen.len(), dataset.row_count()),
        sample_values,
        numeric,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::csv::parse_csv;

    #[test]
    fn profiles_numeric_and_categorical_columns() {
        let ds = parse_csv("name,age\nAlice,30\nBob,\nAlice,40\nCara,20\n", "people");
        let profiles = profile_columns(&ds, &ClassificationPolicy::standalone());
        assert_eq!(profiles.len(), 2);

        let name = &profiles[0];
        assert_eq!(name.kind, ColumnKind::Categorical);
        assert_eq!(name.unique_count, 3);
        assert_eq!(name.diversity, 0.75);
        assert_eq!(name.sample_values.as_slice(), ["Alice", "Bob", "Cara"]);
        assert!(name.numeric.is_none());

        let age = &profiles[1];
        assert_eq!(age.kind, ColumnKind::Numeric);
        assert_eq!(age.missing, 1);
        assert_eq!(
            age.numeric,
            Some(NumericSummary { min: 20.0, max: 40.0, mean: 30.0 })
        );
    }

    #[test]
    fn all_null_numeric_column_has_no_summary() {
        let ds = parse_csv("x\nNA\n\nnull\n", "nulls");
        let profile = &profile_columns(&ds, &ClassificationPolicy::standalone())[0];
        assert_eq!(profile.kind, ColumnKind::Numeric);
        assert_eq!(profile.missing, 2);
        assert!(profile.numeric.is_none());
    }
}
