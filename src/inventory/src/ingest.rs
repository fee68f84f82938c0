use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::error::{InventoryError, InventoryResult};
use crate::flatten::flatten;
use crate::model::{ApplicationRow, CombinedDataset};
use crate::validate::validate;

/// One uploaded document: a display name and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        InputFile {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Reads `path`, naming the file after its final path component.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(InputFile { name, content })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestError {
    pub file_name: String,
    pub message: String,
}

impl Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error processing {}: {}", self.file_name, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub dataset: CombinedDataset,
    pub errors: Vec<IngestError>,
}

impl IngestOutcome {
    /// Error lines as shown to the operator.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

fn process_file(file: &InputFile) -> InventoryResult<Vec<ApplicationRow>> {
    let document = validate(&file.content)?;
    let rows = flatten(&document);
    if rows.is_empty() {
        return Err(InventoryError::schema("'applications' list is empty"));
    }
    Ok(rows)
}

/// Validates and flattens every file, in parallel, then merges rows and errors
/// in the order the files were given. A failing file is recorded and skipped.
pub fn ingest(files: &[InputFile]) -> IngestOutcome {
    let results: Vec<InventoryResult<Vec<ApplicationRow>>> =
        files.par_iter().map(process_file).collect();

    let mut outcome = IngestOutcome::default();
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(rows) => {
                debug!(file = %file.name, rows = rows.len(), "ingested");
                outcome.dataset.extend(rows);
            }
            Err(err) => {
                let error = IngestError {
                    file_name: file.name.clone(),
                    message: err.to_string(),
                };
                warn!("{}", error);
                outcome.errors.push(error);
            }
        }
    }
    outcome
}

/// Digest over the ordered (name, content) pairs. Lengths are folded in so that
/// moving bytes across a file boundary changes the key.
pub fn content_key(files: &[InputFile]) -> String {
    let mut hasher = Sha1::new();
    for file in files {
        hasher.update((file.name.len() as u64).to_le_bytes());
        hasher.update(file.name.as_bytes());
        hasher.update((file.content.len() as u64).to_le_bytes());
        hasher.update(&file.content);
    }
    format!("{:x}", hasher.finalize())
}

/// Content-addressed memo of [`ingest`]. Entries never expire; new content
/// simply produces a new key.
#[derive(Debug, Default)]
pub struct IngestCache {
    entries: HashMap<String, Arc<IngestOutcome>>,
}

impl IngestCache {
    pub fn new() -> Self {
        IngestCache::default()
    }

    pub fn ingest(&mut self, files: &[InputFile]) -> Arc<IngestOutcome> {
        let key = content_key(files);
        if let Some(hit) = self.entries.get(&key) {
            debug!(key = %key, "ingest cache hit");
            return Arc::clone(hit);
        }
        let outcome = Arc::new(ingest(files));
        self.entries.insert(key, Arc::clone(&outcome));
        outcome
    }

    pub fn contains(&self, files: &[InputFile]) -> bool {
        self.entries.contains_key(&content_key(files))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
