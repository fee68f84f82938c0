use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::model::{ApplicationRow, Field};
use crate::query::{filter, Predicate};
use crate::table::{project, Table};

/// A saved view over the dataset: which rows (filters), which columns, and
/// extra columns with default values. It never holds the rows themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTableConfig {
    pub table_name: String,
    pub columns: Vec<String>,
    pub filters: Map<String, Value>,
    #[serde(default)]
    pub custom_columns: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl UserTableConfig {
    /// Filters as a conjunction: a string value means equality, a list means
    /// membership. Filters naming something other than a row attribute are
    /// skipped.
    pub fn predicate(&self) -> Predicate {
        let mut parts = Vec::new();
        for (name, value) in &self.filters {
            let Some(field) = Field::lookup(name) else {
                warn!(table = %self.table_name, filter = %name, "ignoring filter on unknown field");
                continue;
            };
            parts.push(match value {
                Value::Array(values) => {
                    Predicate::one_of(field, values.iter().map(value_text).collect())
                }
                other => Predicate::equals(field, value_text(other)),
            });
        }
        Predicate::And(parts)
    }

    /// Materializes the view over `rows`.
    pub fn apply(&self, rows: &[ApplicationRow]) -> Table {
        let selected = filter(rows, &self.predicate());
        let mut table = project(&selected, &self.columns);
        for (name, default) in &self.custom_columns {
            table = table.with_constant_column(name, &value_text(default));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn rows() -> Vec<ApplicationRow> {
        vec![
            ApplicationRow {
                instance_name: "web-01".to_string(),
                app_name: "nginx".to_string(),
                app_type: "docker".to_string(),
                ..Default::default()
            },
            ApplicationRow {
                instance_name: "db-01".to_string(),
                app_name: "postgres".to_string(),
                app_type: "service".to_string(),
                ..Default::default()
            },
        ]
    }

    fn config(filters: Value, custom: Value) -> UserTableConfig {
        UserTableConfig {
            table_name: "view".to_string(),
            columns: vec!["app_name".to_string(), "instance_name".to_string()],
            filters: filters.as_object().cloned().unwrap_or_default(),
            custom_columns: custom.as_object().cloned().unwrap_or_default(),
            created_at: None,
        }
    }

    #[test]
    fn test_apply_filters_and_custom_columns() {
        let table = config(
            json!({"app_type": "docker"}),
            json!({"migration_wave": "1", "blocked": false}),
        )
        .apply(&rows());
        assert_eq!(
            table.columns,
            vec!["app_name", "instance_name", "migration_wave", "blocked"]
        );
        assert_eq!(table.rows, vec![vec!["nginx", "web-01", "1", "false"]]);
    }

    #[test]
    fn test_list_filter_and_unknown_field() {
        let table = config(
            json!({"instance_name": ["web-01", "db-01"], "owner": "ops"}),
            json!({}),
        )
        .apply(&rows());
        assert_eq!(table.len(), 2);
    }
}
