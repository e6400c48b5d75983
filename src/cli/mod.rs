use serde_json::Value;

use crate::records::Record;
use crate::registry::TableSchema;

pub mod repl;

// Render a record list as an ASCII table: key column first, then the
// editable columns under their display labels.
pub fn print_records(schema: &TableSchema, records: &[Record]) {
    let headers: Vec<&str> = std::iter::once(schema.key_column)
        .chain(schema.display_columns.iter().map(|c| c.label))
        .collect();

    // Cap cell width to keep output readable on narrow terminals
    let max_col_width: usize = match terminal_size::terminal_size() {
        Some((terminal_size::Width(w), _)) if (w as usize) > headers.len() * 4 => {
            ((w as usize) / headers.len()).min(80)
        }
        _ => 40,
    };

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len().min(max_col_width)).collect();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(records.len());
    for rec in records {
        let cells: Vec<String> = rec.values().map(display_cell).collect();
        for (i, cell) in cells.iter().enumerate().take(widths.len()) {
            let w = cell.chars().count().min(max_col_width);
            if w > widths[i] {
                widths[i] = w;
            }
        }
        rows.push(cells);
    }

    let line = |cells: &[String]| {
        let mut out = String::new();
        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                out.push_str(" | ");
            }
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let truncated: String = cell.chars().take(*w).collect();
            out.push_str(&format!("{:<width$}", truncated, width = *w));
        }
        out
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    println!("{}", line(&header_cells));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("-+-"));
    for cells in &rows {
        println!("{}", line(cells));
    }
    println!("({} rows)", records.len());
}

fn display_cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
