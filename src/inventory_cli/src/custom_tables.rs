use anyhow::{anyhow, bail, Context};
use common::format::as_ascii_table;
use inventory::{CustomTable, Store, TemplateSpec};
use tracing::info;

use crate::cmd::{CustomTablesArgs, CustomTablesCommands, StateDbArgs};

#[derive(Debug, Default)]
pub struct CustomTables {}

impl CustomTables {
    pub fn execute(&self, args: &CustomTablesArgs) -> anyhow::Result<()> {
        let db = &args.db;
        match &args.command {
            CustomTablesCommands::Ls => self.ls(db),
            CustomTablesCommands::Create {
                name,
                columns,
                rows,
                replace,
            } => {
                let table = CustomTable::empty(name, columns.clone(), *rows)?;
                self.create(db, table, *replace)
            }
            CustomTablesCommands::FromTemplate {
                name,
                columns,
                app_types,
                instance_names,
                custom_columns,
                replace,
            } => {
                let spec = TemplateSpec {
                    app_types: app_types.clone(),
                    instance_names: instance_names.clone(),
                    columns: columns.clone(),
                    custom_columns: custom_columns.clone(),
                };
                let table = CustomTable::from_template(name, &db.load_dataset()?, &spec)?;
                self.create(db, table, *replace)
            }
            CustomTablesCommands::AddRow { name, count } => self.edit(db, name, |table| {
                for _ in 0..*count {
                    table.add_row();
                }
                Ok(())
            }),
            CustomTablesCommands::AddColumn { name, column } => {
                self.edit(db, name, |table| Ok(table.add_column(column)?))
            }
            CustomTablesCommands::DropColumn { name, column } => self.edit(db, name, |table| {
                if !table.drop_column(column) {
                    bail!("custom table '{}' has no column '{}'", name, column);
                }
                Ok(())
            }),
            CustomTablesCommands::SetCell {
                name,
                row,
                column,
                value,
            } => self.edit(db, name, |table| Ok(table.set_cell(*row, column, value)?)),
            CustomTablesCommands::Rm { name } => self.rm(db, name),
            CustomTablesCommands::Export { name, output } => {
                output.emit(&self.load(db, name)?.as_table())
            }
        }
    }

    fn ls(&self, db: &StateDbArgs) -> anyhow::Result<()> {
        let tables = if Store::exists(&db.state_db_fs_path) {
            db.open()?
                .load_all_custom_tables()
                .with_context(|| format!("[CustomTables::ls] {}", db.state_db_fs_path))?
        } else {
            Vec::new()
        };
        let rows: Vec<Vec<String>> = tables
            .iter()
            .map(|t| {
                vec![
                    t.table_name.clone(),
                    t.columns.join(", "),
                    t.data.len().to_string(),
                    t.template_source.clone().unwrap_or_default(),
                    t.created_at.clone().unwrap_or_default(),
                    t.updated_at.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            as_ascii_table(
                ["Name", "Columns", "Rows", "Template", "Created", "Updated"],
                rows
            )
        );
        Ok(())
    }

    fn create(&self, db: &StateDbArgs, table: CustomTable, replace: bool) -> anyhow::Result<()> {
        let store = db.open()?;
        if !replace && store.load_custom_table(&table.table_name)?.is_some() {
            bail!(
                "custom table '{}' already exists (use --replace to overwrite it)",
                table.table_name
            );
        }
        let saved = store
            .save_custom_table(&table.table_name, &table)
            .with_context(|| format!("[CustomTables::create] {}", table.table_name))?;
        info!(table = %saved.table_name, rows = saved.data.len(), "custom table created");
        println!(
            "created custom table '{}' ({} columns, {} rows)",
            saved.table_name,
            saved.columns.len(),
            saved.data.len()
        );
        Ok(())
    }

    fn load(&self, db: &StateDbArgs, name: &str) -> anyhow::Result<CustomTable> {
        let table = if Store::exists(&db.state_db_fs_path) {
            db.open()?
                .load_custom_table(name)
                .with_context(|| format!("[CustomTables::load] {}", db.state_db_fs_path))?
        } else {
            None
        };
        table.ok_or_else(|| anyhow!("no custom table named '{}'", name))
    }

    /// Loads `name`, applies `change` and stores the result.
    fn edit<F>(&self, db: &StateDbArgs, name: &str, change: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut CustomTable) -> anyhow::Result<()>,
    {
        let mut table = self.load(db, name)?;
        change(&mut table)?;
        let saved = db
            .open()?
            .save_custom_table(name, &table)
            .with_context(|| format!("[CustomTables::edit] {}", name))?;
        println!(
            "updated custom table '{}' ({} columns, {} rows)",
            name,
            saved.columns.len(),
            saved.data.len()
        );
        Ok(())
    }

    fn rm(&self, db: &StateDbArgs, name: &str) -> anyhow::Result<()> {
        let removed = Store::exists(&db.state_db_fs_path)
            && db
                .open()?
                .delete_custom_table(name)
                .with_context(|| format!("[CustomTables::rm] {}", db.state_db_fs_path))?;
        if removed {
            println!("deleted custom table '{}'", name);
        } else {
            println!("no custom table named '{}', nothing deleted", name);
        }
        Ok(())
    }
}
