use std::fs;
use std::path::Path;

use anyhow::Context;
use common::format::{as_ascii_table, as_markdown_table};
use inventory::export::{to_csv, to_json};
use inventory::{ApplicationRow, Store, Table};
use tracing::{debug, info};

pub mod admin;
pub mod cmd;
pub mod custom_tables;
pub mod ingest;
pub mod query;
pub mod report;
pub mod service_management;
pub mod user_tables;

pub use cmd::{Cli, CliCommands};
use cmd::{OutputArgs, OutputFormat, StateDbArgs};

pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        CliCommands::Admin(args) => admin::Admin::default().execute(cli, args),
        CliCommands::Ingest(args) => ingest::Ingest::default().execute(cli, args),
        CliCommands::Summary(args) => report::Report::default().summary(args),
        CliCommands::Instances(args) => report::Report::default().instances(args),
        CliCommands::Ports(args) => report::Report::default().ports(args),
        CliCommands::Types(args) => report::Report::default().types(args),
        CliCommands::Query(args) => query::Query::default().execute(args),
        CliCommands::UserTables(args) => user_tables::UserTables::default().execute(args),
        CliCommands::CustomTables(args) => custom_tables::CustomTables::default().execute(args),
    }
}

impl StateDbArgs {
    /// Opens the store, creating and migrating it as needed.
    pub fn open(&self) -> anyhow::Result<Store> {
        Store::open(&self.state_db_fs_path)
            .with_context(|| format!("[StateDbArgs::open] unable to open {}", self.state_db_fs_path))
    }

    /// The stored dataset; a database that was never created reads as empty
    /// and is not created by reading.
    pub fn load_dataset(&self) -> anyhow::Result<Vec<ApplicationRow>> {
        if !Store::exists(&self.state_db_fs_path) {
            debug!(db = %self.state_db_fs_path, "no database yet, dataset is empty");
            return Ok(Vec::new());
        }
        self.open()?
            .load_dataset()
            .with_context(|| format!("[StateDbArgs::load_dataset] {}", self.state_db_fs_path))
    }
}

/// Renders `table` in the requested format.
pub fn render(table: &Table, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => as_ascii_table(&table.columns, &table.rows),
        OutputFormat::Markdown => as_markdown_table(&table.columns, &table.rows),
        OutputFormat::Csv => to_csv(table),
        OutputFormat::Json => to_json(table),
    }
}

impl OutputArgs {
    /// Prints `table`, or writes it to `--output` when given.
    pub fn emit(&self, table: &Table) -> anyhow::Result<()> {
        let rendered = render(table, self.format);
        match &self.output {
            Some(path) => write_output(path, &rendered),
            None => {
                if self.format == OutputFormat::Csv {
                    print!("{}", rendered);
                } else {
                    println!("{}", rendered);
                }
                Ok(())
            }
        }
    }
}

fn write_output(path: &Path, rendered: &str) -> anyhow::Result<()> {
    fs::write(path, rendered)
        .with_context(|| format!("[OutputArgs::emit] unable to write {}", path.display()))?;
    info!(path = %path.display(), bytes = rendered.len(), "output written");
    Ok(())
}
