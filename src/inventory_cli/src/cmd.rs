use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use inventory::model::Field;
use inventory::query::parse_equals;
use serde::Serialize;

pub const DEFAULT_STATEDB_FS_PATH: &str = inventory::persist::DEFAULT_STATEDB_FS_PATH;

#[derive(Debug, Clone, Copy, ValueEnum, Default, Serialize)]
pub enum LogMode {
    Full,
    Json,
    #[default]
    Compact,
}

impl From<LogMode> for common::logger::LoggingMode {
    fn from(mode: LogMode) -> Self {
        match mode {
            LogMode::Full => common::logger::LoggingMode::Full,
            LogMode::Json => common::logger::LoggingMode::Json,
            LogMode::Compact => common::logger::LoggingMode::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, Serialize, PartialEq)]
pub enum OutputFormat {
    #[default]
    Table,
    Markdown,
    Csv,
    Json,
}

#[derive(Debug, Serialize, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Turn debugging information on (repeat for higher levels)
    #[arg(short, long, action = clap::ArgAction::Count, env = "INVENTORY_DEBUG")]
    pub debug: u8,

    #[command(subcommand)]
    pub command: CliCommands,

    /// Output logs in json format.
    #[clap(long, value_enum)]
    pub log_mode: Option<LogMode>,

    /// File for logs to be written to
    #[arg(long, value_parser)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Subcommand, Clone)]
pub enum CliCommands {
    Admin(AdminArgs),
    Ingest(IngestArgs),
    Summary(SummaryArgs),
    Instances(InstancesArgs),
    Ports(PortsArgs),
    Types(TypesArgs),
    Query(QueryArgs),
    UserTables(UserTablesArgs),
    CustomTables(CustomTablesArgs),
}

#[derive(Debug, Serialize, Args, Clone)]
pub struct StateDbArgs {
    /// target SQLite database
    #[arg(short = 'd', long, default_value = DEFAULT_STATEDB_FS_PATH, env = "INVENTORY_STATEDB_FS_PATH")]
    pub state_db_fs_path: String,
}

/// Where and how to emit a table
#[derive(Debug, Serialize, Args, Clone)]
pub struct OutputArgs {
    /// output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// write to this file instead of STDOUT
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Admin / maintenance utilities
#[derive(Debug, Serialize, Args, Clone)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommands,
}

#[derive(Debug, Serialize, Subcommand, Clone)]
pub enum AdminCommands {
    /// create (or migrate) the database
    Init {
        #[command(flatten)]
        db: StateDbArgs,

        /// remove the existing database first
        #[arg(short, long)]
        remove_existing_first: bool,
    },

    /// delete all application data, user tables and custom tables
    Clear {
        #[command(flatten)]
        db: StateDbArgs,

        /// confirm that everything should be deleted
        #[arg(long)]
        yes: bool,
    },

    /// generate CLI help markdown
    CliHelpMd,
}

/// Validate and flatten instance JSON files into the combined dataset
#[derive(Debug, Serialize, Args, Clone)]
#[command(group(ArgGroup::new("inputs").required(true).multiple(true).args(["file", "root_fs_path"])))]
pub struct IngestArgs {
    /// one or more instance JSON files
    #[arg(short, long)]
    pub file: Vec<PathBuf>,

    /// one or more directories searched recursively for *.json files
    #[arg(short, long)]
    pub root_fs_path: Vec<PathBuf>,

    /// replace the stored dataset with the ingested one
    #[arg(long)]
    pub save: bool,

    /// show stats as an ASCII table after completion
    #[arg(long)]
    pub stats: bool,

    /// emit the ingested rows and errors as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub db: StateDbArgs,
}

/// Summary metrics of the stored dataset
#[derive(Debug, Serialize, Args, Clone)]
pub struct SummaryArgs {
    /// emit the metrics as JSON
    #[arg(long)]
    pub json: bool,

    /// emit markdown tables
    #[arg(long)]
    pub markdown: bool,

    #[command(flatten)]
    pub db: StateDbArgs,
}

/// Per-instance details of the stored dataset
#[derive(Debug, Serialize, Args, Clone)]
pub struct InstancesArgs {
    /// only this instance (name or id)
    #[arg(short, long)]
    pub instance: Option<String>,

    /// emit the details as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub db: StateDbArgs,
}

/// Port usage across instances
#[derive(Debug, Serialize, Args, Clone)]
pub struct PortsArgs {
    /// list (instance, port, application) entries instead of the matrix
    #[arg(long)]
    pub list: bool,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub db: StateDbArgs,
}

/// Application type counts, or their spread across instances
#[derive(Debug, Serialize, Args, Clone)]
pub struct TypesArgs {
    /// show an instance × application type matrix instead of the counts
    #[arg(long)]
    pub matrix: bool,

    /// number of application types to list, most frequent first
    #[arg(long, default_value = "10")]
    pub top: usize,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub db: StateDbArgs,
}

/// Filter and project the stored dataset
#[derive(Debug, Serialize, Args, Clone)]
pub struct QueryArgs {
    /// case-insensitive substring to look for
    #[arg(short, long)]
    pub search: Option<String>,

    /// fields the search term is matched against (defaults to app_name, app_type, instance_name)
    #[arg(long = "search-field")]
    pub search_fields: Vec<Field>,

    /// FIELD=VALUE equality filters, all of which must hold
    #[arg(short = 'w', long = "where", value_parser = parse_equals)]
    pub equals: Vec<(Field, String)>,

    /// columns to keep, in order (defaults to all)
    #[arg(short, long, value_delimiter = ',')]
    pub columns: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub db: StateDbArgs,
}

/// Saved views over the dataset
#[derive(Debug, Serialize, Args, Clone)]
pub struct UserTablesArgs {
    #[command(flatten)]
    pub db: StateDbArgs,

    #[command(subcommand)]
    pub command: UserTablesCommands,
}

#[derive(Debug, Serialize, Subcommand, Clone)]
pub enum UserTablesCommands {
    /// list saved user tables
    Ls,

    /// save (or replace) a user table
    Save {
        name: String,

        /// columns to keep, in order
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// FIELD=VALUE filters; repeating a field accepts any of its values
        #[arg(short = 'w', long = "where", value_parser = parse_equals)]
        filters: Vec<(Field, String)>,

        /// NAME=DEFAULT extra columns appended to every row
        #[arg(long = "custom-column", value_parser = parse_assignment)]
        custom_columns: Vec<(String, String)>,
    },

    /// apply a user table to the stored dataset
    Show {
        name: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// delete a user table
    Rm { name: String },
}

/// Operator-edited tables
#[derive(Debug, Serialize, Args, Clone)]
pub struct CustomTablesArgs {
    #[command(flatten)]
    pub db: StateDbArgs,

    #[command(subcommand)]
    pub command: CustomTablesCommands,
}

#[derive(Debug, Serialize, Subcommand, Clone)]
pub enum CustomTablesCommands {
    /// list custom tables
    Ls,

    /// create a table of blank rows
    Create {
        name: String,

        /// column names, in order
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// number of blank rows
        #[arg(long, default_value_t = 0)]
        rows: usize,

        /// overwrite an existing table with the same name
        #[arg(long)]
        replace: bool,
    },

    /// create a table seeded from the stored dataset
    FromTemplate {
        name: String,

        /// dataset columns to copy, in order
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// only applications of these types
        #[arg(long = "app-type")]
        app_types: Vec<String>,

        /// only applications on these instances (by name)
        #[arg(long = "instance")]
        instance_names: Vec<String>,

        /// blank columns appended after the dataset columns
        #[arg(long = "custom-column")]
        custom_columns: Vec<String>,

        /// overwrite an existing table with the same name
        #[arg(long)]
        replace: bool,
    },

    /// append blank rows
    AddRow {
        name: String,

        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// append a blank column
    AddColumn { name: String, column: String },

    /// remove a column
    DropColumn { name: String, column: String },

    /// set one cell (rows are numbered from 0)
    SetCell {
        name: String,

        #[arg(long)]
        row: usize,

        #[arg(long)]
        column: String,

        #[arg(long)]
        value: String,
    },

    /// delete a custom table
    Rm { name: String },

    /// print or export a custom table
    Export {
        name: String,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Parses `NAME=VALUE`; the value may be empty.
pub fn parse_assignment(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", text)),
    }
}
