use std::fs;

use anyhow::{bail, Context};
use inventory::Store;
use tracing::info;

use crate::cmd::{AdminArgs, AdminCommands, StateDbArgs};
use crate::Cli;

// Implement methods for `AdminCommands`, ensure that whether the commands
// are called from CLI or natively within Rust, all the calls remain ergonomic.
#[derive(Debug, Default)]
pub struct Admin {}

impl Admin {
    pub fn execute(&self, _cli: &Cli, args: &AdminArgs) -> anyhow::Result<()> {
        match &args.command {
            AdminCommands::Init {
                db,
                remove_existing_first,
            } => self.init(db, *remove_existing_first),
            AdminCommands::Clear { db, yes } => self.clear(db, *yes),
            AdminCommands::CliHelpMd => self.cli_help_markdown(),
        }
    }

    fn init(&self, db: &StateDbArgs, remove_existing_first: bool) -> anyhow::Result<()> {
        let db_fs_path = &db.state_db_fs_path;
        if remove_existing_first && Store::exists(db_fs_path) {
            fs::remove_file(db_fs_path)
                .with_context(|| format!("[Admin::init] unable to remove {}", db_fs_path))?;
            info!(db = %db_fs_path, "removed existing database");
        }
        let store = db.open()?;
        println!(
            "{} ready (schema version {})",
            store.db_fs_path(),
            store.schema_version()?
        );
        Ok(())
    }

    fn clear(&self, db: &StateDbArgs, yes: bool) -> anyhow::Result<()> {
        let db_fs_path = &db.state_db_fs_path;
        if !yes {
            bail!(
                "refusing to delete all data in {} without --yes",
                db_fs_path
            );
        }
        if !Store::exists(db_fs_path) {
            println!("{} does not exist, nothing to clear", db_fs_path);
            return Ok(());
        }
        db.open()?
            .clear_all()
            .with_context(|| format!("[Admin::clear] {}", db_fs_path))?;
        println!("cleared all data in {}", db_fs_path);
        Ok(())
    }

    fn cli_help_markdown(&self) -> anyhow::Result<()> {
        clap_markdown::print_help_markdown::<Cli>();
        Ok(())
    }
}
