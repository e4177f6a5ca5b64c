use super::metrics::DashboardMetrics;

/// Plain-language follow-ups derived from a dashboard rollup.
pub fn recommendations(metrics: &DashboardMetrics) -> Vec<String> {
    let mut out = Vec::new();

    if metrics.total_rows == 0 {
        out.push("The file has no data rows; check that the header is followed by records.".to_string());
        return out;
    }

    if metrics.missing_values == 0 {
        out.push("No missing values detected; the dataset is ready for analysis.".to_string());
    } else if metrics.completeness < 0.85 {
        out.push(format!(
            "Significant missing data ({:.1}% of cells); consider dropping incomplete rows or imputing values.",
            (1.0 - metrics.completeness) * 100.0
        ));
    } else {
        out.push(format!(
            "{} missing values found; fill or drop them before modelling.",
            metrics.missing_values
        ));
    }

    if metrics.numeric_columns == 0 {
        out.push("No numeric columns; summary statistics and regression views will be empty.".to_string());
    } else if metrics.numeric_columns >= 2 {
        out.push("Several numeric columns; explore correlations between them.".to_string());
    }

    if metrics.categorical_columns > 0 {
        out.push("Categorical columns present; group-by charts can break results down by category.".to_string());
    }

    if metrics.total_rows < 30 {
        out.push("Fewer than 30 rows; statistical results may not be reliable.".to_string());
    }

    out
}
