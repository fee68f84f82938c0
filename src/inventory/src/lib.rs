#[macro_use]
mod helpers;

pub mod aggregate;
pub mod custom_table;
pub mod error;
pub mod export;
pub mod flatten;
pub mod ingest;
pub mod model;
pub mod persist;
pub mod query;
pub mod table;
pub mod user_table;
pub mod validate;

pub use custom_table::{CustomTable, TemplateSpec};
pub use error::{InventoryError, InventoryResult};
pub use ingest::{ingest, IngestCache, IngestError, IngestOutcome, InputFile};
pub use model::{ApplicationRow, CombinedDataset, Field};
pub use persist::Store;
pub use query::{filter, Predicate};
pub use table::{project, Table};
pub use user_table::UserTableConfig;
