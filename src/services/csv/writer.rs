use crate::models::{Cell, Dataset};

/// Serializes a dataset back to comma-separated text.
///
/// Text containing a comma is wrapped in double quotes. The parser does not
/// honour those quotes, so such fields do not survive a write/parse round
/// trip; everything else does.
pub fn to_csv(dataset: &Dataset) -> String {
    let mut out = String::with_capacity(dataset.file_size());

    out.push_str(&dataset.columns().iter().map(|c| quote_if_needed(c)).collect::<Vec<_>>().join(","));
    out.push('\n');

    for row in dataset.rows() {
        let line = row.iter().map(format_cell).collect::<Vec<_>>().join(",");
        out.push_str(&line);
        out.push('\n');
    }

    out
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => quote_if_needed(s),
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.contains(',') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}
