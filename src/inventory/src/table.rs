use serde::{Deserialize, Serialize};

use crate::model::{ApplicationRow, Field};

/// A rectangular grid of text cells with named columns. Projections of the
/// dataset and user-edited tables both use this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Table { columns, rows }
    }

    /// All row attributes, in declaration order.
    pub fn from_rows(rows: &[ApplicationRow]) -> Self {
        project(rows, &Field::ALL.map(|f| f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Appends a column holding `value` on every row.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        self.columns.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(value.to_string());
        }
        self
    }
}

/// Restricts rows to `columns`, preserving row order. Names that are not row
/// attributes are dropped silently; duplicates keep their first occurrence.
pub fn project<S: AsRef<str>>(rows: &[ApplicationRow], columns: &[S]) -> Table {
    let mut fields: Vec<Field> = Vec::new();
    for name in columns {
        if let Some(field) = Field::lookup(name.as_ref()) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }
    Table {
        columns: fields.iter().map(|f| f.as_str().to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| fields.iter().map(|f| row.get(*f).to_string()).collect())
            .collect(),
    }
}
