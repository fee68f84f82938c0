use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, InventoryResult};
use crate::model::{ApplicationRow, Field};
use crate::query::{filter, Predicate};
use crate::table::{project, Table};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TEMPLATE_SOURCE_APPLICATION_DATA: &str = "application_data";

pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// A free-form grid edited by the operator, independent of ingested data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTable {
    pub table_name: String,
    pub columns: Vec<String>,
    pub data: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Which slice of the dataset seeds a template table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSpec {
    /// Keep only these application types; empty keeps all.
    pub app_types: Vec<String>,
    /// Keep only these instances (by name); empty keeps all.
    pub instance_names: Vec<String>,
    pub columns: Vec<String>,
    /// Extra blank columns appended after the dataset columns.
    pub custom_columns: Vec<String>,
}

impl CustomTable {
    /// A table of `row_count` blank rows.
    pub fn empty(table_name: &str, columns: Vec<String>, row_count: usize) -> InventoryResult<Self> {
        check_columns(&columns)?;
        let data = (0..row_count).map(|_| vec![String::new(); columns.len()]).collect();
        Ok(CustomTable {
            table_name: table_name.to_string(),
            columns,
            data,
            ..Default::default()
        })
    }

    /// Seeds a table from the dataset rows selected by `spec`.
    pub fn from_template(
        table_name: &str,
        rows: &[ApplicationRow],
        spec: &TemplateSpec,
    ) -> InventoryResult<Self> {
        let mut parts = Vec::new();
        if !spec.app_types.is_empty() {
            parts.push(Predicate::one_of(Field::AppType, spec.app_types.clone()));
        }
        if !spec.instance_names.is_empty() {
            parts.push(Predicate::one_of(Field::InstanceName, spec.instance_names.clone()));
        }
        let selected = filter(rows, &Predicate::And(parts));
        let mut table = project(&selected, &spec.columns);
        if table.columns.is_empty() {
            return Err(InventoryError::InvalidEdit(
                "a template needs at least one dataset column".to_string(),
            ));
        }
        for custom in &spec.custom_columns {
            table = table.with_constant_column(custom, "");
        }
        check_columns(&table.columns)?;
        Ok(CustomTable {
            table_name: table_name.to_string(),
            columns: table.columns,
            data: table.rows,
            template_source: Some(TEMPLATE_SOURCE_APPLICATION_DATA.to_string()),
            ..Default::default()
        })
    }

    pub fn add_row(&mut self) {
        self.data.push(vec![String::new(); self.columns.len()]);
    }

    pub fn add_column(&mut self, name: &str) -> InventoryResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InventoryError::InvalidEdit("column name is blank".to_string()));
        }
        if self.columns.iter().any(|c| c == name) {
            return Err(InventoryError::InvalidEdit(format!(
                "column '{}' already exists",
                name
            )));
        }
        self.repair();
        self.columns.push(name.to_string());
        for row in self.data.iter_mut() {
            row.push(String::new());
        }
        Ok(())
    }

    /// Removes `name`; returns whether it existed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        self.repair();
        match self.columns.iter().position(|c| c == name) {
            Some(index) => {
                self.columns.remove(index);
                for row in self.data.iter_mut() {
                    row.remove(index);
                }
                true
            }
            None => false,
        }
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: &str) -> InventoryResult<()> {
        self.repair();
        let col = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| InventoryError::InvalidEdit(format!("no column '{}'", column)))?;
        let rows = self.data.len();
        let cells = self.data.get_mut(row).ok_or_else(|| {
            InventoryError::InvalidEdit(format!("row {} out of range (table has {})", row, rows))
        })?;
        cells[col] = value.to_string();
        Ok(())
    }

    pub fn is_rectangular(&self) -> bool {
        self.data.iter().all(|row| row.len() == self.columns.len())
    }

    /// Pads short rows with blank cells and truncates long ones so every row
    /// has one cell per column. Returns how many rows changed.
    pub fn repair(&mut self) -> usize {
        let width = self.columns.len();
        let mut repaired = 0;
        for row in self.data.iter_mut() {
            if row.len() != width {
                row.resize(width, String::new());
                repaired += 1;
            }
        }
        repaired
    }

    pub fn as_table(&self) -> Table {
        let mut copy = self.clone();
        copy.repair();
        Table::new(copy.columns, copy.data)
    }
}

fn check_columns(columns: &[String]) -> InventoryResult<()> {
    if columns.is_empty() {
        return Err(InventoryError::InvalidEdit(
            "a table needs at least one column".to_string(),
        ));
    }
    for (i, column) in columns.iter().enumerate() {
        if column.trim().is_empty() {
            return Err(InventoryError::InvalidEdit(format!("column {} is blank", i + 1)));
        }
        if columns[..i].contains(column) {
            return Err(InventoryError::InvalidEdit(format!(
                "column '{}' is repeated",
                column
            )));
        }
    }
    Ok(())
}
