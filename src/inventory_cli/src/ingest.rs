use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use common::format::as_key_value_table;
use inventory::aggregate::count_distinct;
use inventory::{ingest, Field, IngestError, IngestOutcome, InputFile};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cmd::IngestArgs;
use crate::Cli;

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Explicit files first, in the order given, then every `*.json` below each
/// root in file-name order.
pub fn candidate_paths(files: &[PathBuf], roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = files.to_vec();
    for root in roots {
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && is_json_file(entry.path()) {
                candidates.push(entry.into_path());
            }
        }
    }
    candidates
}

/// Interleaves read failures with ingest errors so error lines follow the
/// order of `paths`. `unread` has one slot per path (`None` when the path was
/// read into `files`); `ingested` holds at most one error per file, in file
/// order.
pub fn errors_in_path_order(
    unread: Vec<Option<IngestError>>,
    files: &[InputFile],
    ingested: Vec<IngestError>,
) -> Vec<IngestError> {
    let mut ingested = ingested.into_iter().peekable();
    let mut files = files.iter();
    let mut merged = Vec::with_capacity(unread.len());
    for slot in unread {
        match slot {
            Some(err) => merged.push(err),
            None => {
                let Some(file) = files.next() else { continue };
                if matches!(ingested.peek(), Some(err) if err.file_name == file.name) {
                    merged.extend(ingested.next());
                }
            }
        }
    }
    merged.extend(ingested);
    merged
}

#[derive(Debug, Default)]
pub struct Ingest {}

impl Ingest {
    pub fn execute(&self, _cli: &Cli, args: &IngestArgs) -> anyhow::Result<()> {
        let paths = candidate_paths(&args.file, &args.root_fs_path);
        if paths.is_empty() {
            bail!("no JSON files found to ingest");
        }

        // unreadable files are reported the same way as invalid ones
        let mut unread = Vec::with_capacity(paths.len());
        let mut files = Vec::new();
        for path in &paths {
            match InputFile::from_path(path) {
                Ok(file) => {
                    files.push(file);
                    unread.push(None);
                }
                Err(err) => {
                    warn!(path = %path.display(), "unable to read: {}", err);
                    unread.push(Some(IngestError {
                        file_name: path.display().to_string(),
                        message: err.to_string(),
                    }));
                }
            }
        }
        debug!(files = files.len(), unreadable = paths.len() - files.len(), "ingesting");

        let mut outcome = ingest(&files);
        outcome.errors = errors_in_path_order(unread, &files, std::mem::take(&mut outcome.errors));

        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome)
                    .context("[Ingest::execute] unable to serialize outcome")?
            );
        } else {
            for message in outcome.error_messages() {
                println!("{}", message);
            }
        }

        if args.stats {
            println!("{}", self.stats(paths.len(), &outcome));
        }

        if outcome.dataset.is_empty() {
            bail!("no applications ingested from {} file(s)", paths.len());
        }

        if args.save {
            let saved = args
                .db
                .open()?
                .save_dataset(&outcome.dataset)
                .with_context(|| format!("[Ingest::execute] saving to {}", args.db.state_db_fs_path))?;
            info!(rows = saved, db = %args.db.state_db_fs_path, "dataset saved");
            if !args.json {
                println!("saved {} rows to {}", saved, args.db.state_db_fs_path);
            }
        }
        Ok(())
    }

    fn stats(&self, file_count: usize, outcome: &IngestOutcome) -> String {
        as_key_value_table(
            &[
                ("Files", file_count.to_string()),
                ("Files with errors", outcome.errors.len().to_string()),
                (
                    "Instances",
                    count_distinct(&outcome.dataset, Field::InstanceId).to_string(),
                ),
                ("Applications", outcome.dataset.len().to_string()),
            ],
            false,
        )
    }
}
