use serde_json::{Map, Value};

use crate::table::Table;

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|c| csv_field(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Header line plus one line per row, quoting fields that need it.
pub fn to_csv(table: &Table) -> String {
    let mut out = csv_line(&table.columns);
    out.push('\n');
    for row in &table.rows {
        out.push_str(&csv_line(row));
        out.push('\n');
    }
    out
}

/// Array of objects keyed by column name, in column order, 2-space indented.
pub fn to_json(table: &Table) -> String {
    let records: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let mut record = Map::new();
            for (column, cell) in table.columns.iter().zip(row.iter()) {
                record.insert(column.clone(), Value::String(cell.clone()));
            }
            Value::Object(record)
        })
        .collect();
    format!("{:#}", Value::Array(records))
}
