use crate::models::{Cell, Dataset, ParseDiagnostics, Row};
use super::utils::{clean_field, parse_field};

/// Parses comma-separated text into a [`Dataset`].
///
/// Permissive: it never fails. The first line is the header; fields are
/// split on every comma with no quote awareness, so a quoted field holding a
/// comma is split in two. Ragged lines are padded with nulls or truncated and
/// counted in the dataset's diagnostics. Empty input yields a dataset with no
/// columns and no rows.
pub fn parse_csv(content: &str, name: &str) -> Dataset {
    let start = std::time::Instant::now();

    let mut lines = content
        .split('\n')
        .filter(|line| !line.trim().is_empty());

    let columns: Vec<String> = match lines.next() {
        Some(header) => header.split(',').map(clean_field).collect(),
        None => {
            tracing::debug!("Empty CSV input for {}", name);
            return Dataset::new(name, Vec::new(), Vec::new(), content.len(), ParseDiagnostics::default());
        }
    };

    let width = columns.len();
    let mut diagnostics = ParseDiagnostics::default();

    let data: Vec<Row> = lines
        .map(|line| {
            let mut row: Row = line.split(',').map(parse_field).collect();
            if row.len() < width {
                diagnostics.short_rows += 1;
                row.resize(width, Cell::Null);
            } else if row.len() > width {
                diagnostics.long_rows += 1;
                row.truncate(width);
            }
            row
        })
        .collect();

    if !diagnostics.is_clean() {
        tracing::warn!(
            "CSV {} has ragged rows: {} short, {} long (of {})",
            name,
            diagnostics.short_rows,
            diagnostics.long_rows,
            data.len()
        );
    }

    let dataset = Dataset::new(name, columns, data, content.len(), diagnostics);
    tracing::info!(
        "Parsed CSV {} into dataset {}: {} rows x {} columns in {:?}",
        name,
        dataset.id(),
        dataset.row_count(),
        dataset.column_count(),
        start.elapsed()
    );
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn t(v: &str) -> Cell {
        Cell::Text(v.to_string())
    }

    #[test]
    fn parses_numeric_table() {
        let ds = parse_csv("a,b\n1,2\n3,4\n", "nums");
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows(), [vec![n(1.0), n(2.0)], vec![n(3.0), n(4.0)]]);
        assert_eq!(ds.file_size(), 12);
        assert!(ds.diagnostics().is_clean());
    }

    #[test]
    fn trailing_blank_lines_are_not_rows() {
        let ds = parse_csv("a\n1\n\n\n", "x");
        assert_eq!(ds.row_count(), 1);
        let ds = parse_csv("a\n1", "x");
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn empty_cell_is_null() {
        let ds = parse_csv("name,age\nAlice,30\nBob,\n", "people");
        assert_eq!(ds.rows()[0], vec![t("Alice"), n(30.0)]);
        assert_eq!(ds.rows()[1], vec![t("Bob"), Cell::Null]);
    }

    #[test]
    fn short_lines_are_padded_with_null() {
        let ds = parse_csv("a,b,c\n1\n1,2\n", "short");
        assert_eq!(ds.rows()[0], vec![n(1.0), Cell::Null, Cell::Null]);
        assert_eq!(ds.rows()[1], vec![n(1.0), n(2.0), Cell::Null]);
        assert_eq!(ds.diagnostics().short_rows, 2);
    }

    #[test]
    fn long_lines_are_truncated() {
        let ds = parse_csv("a,b\n1,2,3\n", "long");
        assert_eq!(ds.rows()[0], vec![n(1.0), n(2.0)]);
        assert_eq!(ds.diagnostics().long_rows, 1);
    }

    #[test]
    fn empty_input_gives_empty_dataset() {
        for input in ["", "\n", "  \n\n"] {
            let ds = parse_csv(input, "empty");
            assert!(ds.columns().is_empty());
            assert_eq!(ds.row_count(), 0);
        }
    }

    #[test]
    fn headers_are_trimmed_and_unquoted_but_not_typed() {
        let ds = parse_csv(" \"id\" , 2019 ,null\n1,2,3\n", "h");
        assert_eq!(ds.columns(), ["id", "2019", "null"]);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let ds = parse_csv("a,b\r\n1,x\r\n", "crlf");
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(ds.rows()[0], vec![n(1.0), t("x")]);
    }

    #[test]
    fn quoted_comma_is_still_a_delimiter() {
        let ds = parse_csv("city,pop\n\"Paris, FR\",2\n", "naive");
        assert_eq!(ds.rows()[0], vec![t("Paris"), t("FR")]);
        assert_eq!(ds.diagnostics().long_rows, 1);
    }

    #[test]
    fn cells_are_typed_independently() {
        let ds = parse_csv("v\n1\nabc\nNA\n2.5\n", "mixed");
        let values: Vec<Cell> = ds.column_values("v").unwrap().cloned().collect();
        assert_eq!(values, vec![n(1.0), t("abc"), Cell::Null, n(2.5)]);
    }
}
