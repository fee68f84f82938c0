use anyhow::{anyhow, Context};
use common::format::as_ascii_table;
use inventory::{Field, Store};
use serde_json::{Map, Value};
use tracing::info;

use crate::cmd::{OutputArgs, StateDbArgs, UserTablesArgs, UserTablesCommands};

/// Folds repeated `FIELD=VALUE` filters into the stored shape: one value stays
/// a string, several values for the same field become a list.
pub fn filters_map(filters: &[(Field, String)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (field, value) in filters {
        let value = Value::String(value.clone());
        match map.get_mut(field.as_str()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(field.as_str().to_string(), value);
            }
        }
    }
    map
}

fn json_text(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct UserTables {}

impl UserTables {
    pub fn execute(&self, args: &UserTablesArgs) -> anyhow::Result<()> {
        match &args.command {
            UserTablesCommands::Ls => self.ls(&args.db),
            UserTablesCommands::Save {
                name,
                columns,
                filters,
                custom_columns,
            } => self.save(&args.db, name, columns, filters, custom_columns),
            UserTablesCommands::Show { name, output } => self.show(&args.db, name, output),
            UserTablesCommands::Rm { name } => self.rm(&args.db, name),
        }
    }

    fn ls(&self, db: &StateDbArgs) -> anyhow::Result<()> {
        let configs = if Store::exists(&db.state_db_fs_path) {
            db.open()?
                .load_all_user_table_configs()
                .with_context(|| format!("[UserTables::ls] {}", db.state_db_fs_path))?
        } else {
            Vec::new()
        };
        let rows: Vec<Vec<String>> = configs
            .iter()
            .map(|c| {
                vec![
                    c.table_name.clone(),
                    c.columns.join(", "),
                    json_text(&c.filters),
                    json_text(&c.custom_columns),
                    c.created_at.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            as_ascii_table(
                ["Name", "Columns", "Filters", "Custom Columns", "Created"],
                rows
            )
        );
        Ok(())
    }

    fn save(
        &self,
        db: &StateDbArgs,
        name: &str,
        columns: &[String],
        filters: &[(Field, String)],
        custom_columns: &[(String, String)],
    ) -> anyhow::Result<()> {
        let custom_columns: Map<String, Value> = custom_columns
            .iter()
            .map(|(column, default)| (column.clone(), Value::String(default.clone())))
            .collect();
        db.open()?
            .save_user_table_config(name, columns, &filters_map(filters), &custom_columns)
            .with_context(|| format!("[UserTables::save] {} in {}", name, db.state_db_fs_path))?;
        info!(table = name, "user table saved");
        println!("saved user table '{}'", name);
        Ok(())
    }

    fn show(&self, db: &StateDbArgs, name: &str, output: &OutputArgs) -> anyhow::Result<()> {
        let config = if Store::exists(&db.state_db_fs_path) {
            db.open()?
                .load_user_table_config(name)
                .with_context(|| format!("[UserTables::show] {}", db.state_db_fs_path))?
        } else {
            None
        };
        let config = config.ok_or_else(|| anyhow!("no user table named '{}'", name))?;
        output.emit(&config.apply(&db.load_dataset()?))
    }

    fn rm(&self, db: &StateDbArgs, name: &str) -> anyhow::Result<()> {
        let removed = Store::exists(&db.state_db_fs_path)
            && db
                .open()?
                .delete_user_table_config(name)
                .with_context(|| format!("[UserTables::rm] {}", db.state_db_fs_path))?;
        if removed {
            println!("deleted user table '{}'", name);
        } else {
            println!("no user table named '{}', nothing deleted", name);
        }
        Ok(())
    }
}
