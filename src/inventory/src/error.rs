use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("File is empty")]
    EmptyInput,
    #[error("Invalid JSON format at line {line}: {message}")]
    MalformedJson {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("{}", .0.join("; "))]
    Schema(Vec<String>),
    #[error("invalid table edit: {0}")]
    InvalidEdit(String),
    #[error("store I/O error: {0}")]
    StoreIo(String),
    #[error("store corruption: {0}")]
    StoreCorruption(String),
}

impl InventoryError {
    pub fn schema(violation: impl Into<String>) -> Self {
        InventoryError::Schema(vec![violation.into()])
    }

    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            InventoryError::StoreIo(_) | InventoryError::StoreCorruption(_)
        )
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        let (line, column) = (err.line(), err.column());
        let text = err.to_string();
        let location = format!(" at line {} column {}", line, column);
        let message = text.strip_suffix(&location).unwrap_or(&text).to_string();
        InventoryError::MalformedJson {
            line,
            column,
            message,
        }
    }
}

impl From<rusqlite::Error> for InventoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase
                ) =>
            {
                InventoryError::StoreCorruption(err.to_string())
            }
            _ => InventoryError::StoreIo(err.to_string()),
        }
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;
