use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Result as RusqliteResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::custom_table::{now_timestamp, CustomTable};
use crate::error::{InventoryError, InventoryResult};
use crate::model::ApplicationRow;
use crate::user_table::UserTableConfig;

pub const DEFAULT_STATEDB_FS_PATH: &str = "dashboard_data.db";

mod sql {
    use rusqlite::{Connection, Result as RusqliteResult, ToSql};

    execute_sql_batch!(
        create_base_tables,
        indoc::indoc! {"
            CREATE TABLE IF NOT EXISTS application_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_id TEXT,
                instance_name TEXT,
                app_name TEXT,
                app_type TEXT,
                app_status TEXT,
                app_image TEXT,
                ports TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS user_tables (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                table_name TEXT UNIQUE,
                columns TEXT,
                filters TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );"}
    );

    execute_sql_batch!(
        create_custom_tables,
        indoc::indoc! {"
            CREATE TABLE IF NOT EXISTS custom_tables (
                table_name TEXT PRIMARY KEY,
                table_data TEXT,
                created_at TEXT,
                updated_at TEXT
            );"}
    );

    execute_sql_no_args!(delete_application_data, "DELETE FROM application_data");
    execute_sql_no_args!(delete_user_tables, "DELETE FROM user_tables");
    execute_sql_no_args!(delete_custom_tables, "DELETE FROM custom_tables");

    execute_sql!(
        insert_application_row,
        indoc::indoc! {"
            INSERT INTO application_data (instance_id, instance_name, script_version, app_name, app_type,
                                          app_status, app_image, ports, pids, process_name, container_id)
                                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"},
        instance_id: &str,
        instance_name: &str,
        script_version: &str,
        app_name: &str,
        app_type: &str,
        app_status: &str,
        app_image: &str,
        ports: &str,
        pids: &str,
        process_name: &str,
        container_id: &str
    );

    query_sql_rows_no_args!(
        application_rows,
        indoc::indoc! {"
              SELECT instance_id, instance_name, script_version, app_name, app_type, app_status,
                     app_image, ports, pids, process_name, container_id
                FROM application_data
            ORDER BY id"};
        instance_id: Option<String>,
        instance_name: Option<String>,
        script_version: Option<String>,
        app_name: Option<String>,
        app_type: Option<String>,
        app_status: Option<String>,
        app_image: Option<String>,
        ports: Option<String>,
        pids: Option<String>,
        process_name: Option<String>,
        container_id: Option<String>
    );

    execute_sql!(
        replace_user_table,
        indoc::indoc! {"
            INSERT OR REPLACE INTO user_tables (table_name, columns, filters, custom_columns)
                                        VALUES (?1, ?2, ?3, ?4)"},
        table_name: &str,
        columns: &str,
        filters: &str,
        custom_columns: &str
    );

    execute_sql!(
        delete_user_table,
        "DELETE FROM user_tables WHERE table_name = ?1",
        table_name: &str
    );

    query_sql_rows_no_args!(
        user_tables,
        "SELECT table_name, columns, filters, custom_columns, created_at FROM user_tables ORDER BY id";
        table_name: String,
        columns: Option<String>,
        filters: Option<String>,
        custom_columns: Option<String>,
        created_at: Option<String>
    );

    // created_at is only written on first insert, so re-saving keeps it
    execute_sql!(
        upsert_custom_table,
        indoc::indoc! {"
            INSERT INTO custom_tables (table_name, table_data, created_at, updated_at)
                               VALUES (?1, ?2, ?3, ?4)
                          ON CONFLICT (table_name)
                            DO UPDATE SET table_data = excluded.table_data,
                                          updated_at = excluded.updated_at"},
        table_name: &str,
        table_data: &str,
        created_at: &str,
        updated_at: &str
    );

    execute_sql!(
        delete_custom_table,
        "DELETE FROM custom_tables WHERE table_name = ?1",
        table_name: &str
    );

    query_sql_optional!(
        custom_table_timestamps,
        "SELECT created_at, updated_at FROM custom_tables WHERE table_name = ?1",
        table_name: &str;
        created_at: Option<String>,
        updated_at: Option<String>
    );

    query_sql_rows_no_args!(
        custom_tables,
        "SELECT table_name, table_data, created_at, updated_at FROM custom_tables ORDER BY rowid";
        table_name: String,
        table_data: Option<String>,
        created_at: Option<String>,
        updated_at: Option<String>
    );
}

type Migration = fn(&Connection) -> RusqliteResult<()>;

/// Ordered schema steps; step `n` moves `PRAGMA user_version` from `n - 1` to `n`.
/// Steps tolerate databases written before versioning existed, which already
/// carry some of these tables and columns.
const MIGRATIONS: [(&str, Migration); 4] = [
    ("base tables", sql::create_base_tables),
    ("user_tables.custom_columns", add_user_table_custom_columns),
    ("custom_tables", sql::create_custom_tables),
    ("application_data detail columns", add_application_detail_columns),
];

pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

fn column_exists(conn: &Connection, table: &str, column: &str) -> RusqliteResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> RusqliteResult<()> {
    if !column_exists(conn, table, column)? {
        conn.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column, definition
        ))?;
    }
    Ok(())
}

fn add_user_table_custom_columns(conn: &Connection) -> RusqliteResult<()> {
    add_column_if_missing(conn, "user_tables", "custom_columns", "TEXT DEFAULT '{}'")
}

fn add_application_detail_columns(conn: &Connection) -> RusqliteResult<()> {
    for column in ["script_version", "pids", "process_name", "container_id"] {
        add_column_if_missing(conn, "application_data", column, "TEXT DEFAULT ''")?;
    }
    Ok(())
}

fn user_version(conn: &Connection) -> RusqliteResult<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Brings `conn` up to [`SCHEMA_VERSION`], one transaction per step.
pub fn execute_migrations(conn: &mut Connection) -> InventoryResult<i32> {
    let current = user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(InventoryError::StoreCorruption(format!(
            "schema version {} is newer than supported version {}",
            current, SCHEMA_VERSION
        )));
    }
    for (index, (name, step)) in MIGRATIONS.iter().enumerate() {
        let version = index as i32 + 1;
        if version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        step(&tx)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!(version, migration = *name, "store migrated");
    }
    Ok(SCHEMA_VERSION)
}

/// Turns a stored `ports`/`pids` value into the `", "`-joined form. Bracketed
/// JSON array text is re-joined (`""` when it does not parse); any other text
/// is kept as stored.
pub fn canonical_list_text(stored: Option<&str>) -> String {
    let Some(raw) = stored else {
        return String::new();
    };
    let text = raw.trim();
    if matches!(text, "" | "nan" | "None" | "null") {
        return String::new();
    }
    if text.starts_with('[') && text.ends_with(']') {
        return match serde_json::from_str::<Vec<Value>>(text) {
            Ok(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Err(_) => String::new(),
        };
    }
    raw.to_string()
}

/// Shape of `custom_tables.table_data`. Cells are read leniently because older
/// stores may hold numbers or nulls in them.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTableData {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(what: &str, name: &str, text: &str) -> InventoryResult<T> {
    serde_json::from_str(text).map_err(|err| {
        InventoryError::StoreCorruption(format!("{} of '{}' is not valid JSON: {}", what, name, err))
    })
}

fn decode_optional_json<T>(what: &str, name: &str, text: Option<&str>) -> InventoryResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match text {
        Some(text) if !text.trim().is_empty() => decode_json(what, name, text),
        _ => Ok(T::default()),
    }
}

fn decode_user_table(
    table_name: String,
    columns: Option<String>,
    filters: Option<String>,
    custom_columns: Option<String>,
    created_at: Option<String>,
) -> InventoryResult<UserTableConfig> {
    Ok(UserTableConfig {
        columns: decode_optional_json("columns", &table_name, columns.as_deref())?,
        filters: decode_optional_json("filters", &table_name, filters.as_deref())?,
        custom_columns: decode_optional_json("custom_columns", &table_name, custom_columns.as_deref())?,
        created_at,
        table_name,
    })
}

fn encode_json<T: Serialize>(value: &T) -> InventoryResult<String> {
    serde_json::to_string(value).map_err(|err| InventoryError::StoreIo(err.to_string()))
}

/// The SQLite-backed store for the dataset, user table configurations and
/// custom tables. Every public operation runs in its own transaction, and the
/// connection mutex keeps a single writer at a time.
#[derive(Debug)]
pub struct Store {
    db_fs_path: String,
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if needed) the database at `db_fs_path` and migrates it.
    pub fn open(db_fs_path: &str) -> InventoryResult<Store> {
        let conn = Connection::open(db_fs_path)?;
        Store::from_conn(conn, db_fs_path)
    }

    pub fn open_in_memory() -> InventoryResult<Store> {
        Store::from_conn(Connection::open_in_memory()?, ":memory:")
    }

    /// Whether a database file is present; an absent store reads as empty.
    pub fn exists(db_fs_path: &str) -> bool {
        Path::new(db_fs_path).is_file()
    }

    fn from_conn(mut conn: Connection, db_fs_path: &str) -> InventoryResult<Store> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let version = execute_migrations(&mut conn)?;
        debug!(db_fs_path, version, "store ready");
        Ok(Store {
            db_fs_path: db_fs_path.to_string(),
            conn: Mutex::new(conn),
        })
    }

    pub fn db_fs_path(&self) -> &str {
        &self.db_fs_path
    }

    fn lock(&self) -> InventoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| InventoryError::StoreIo(format!("{} connection lock poisoned", self.db_fs_path)))
    }

    pub fn schema_version(&self) -> InventoryResult<i32> {
        let conn = self.lock()?;
        Ok(user_version(&conn)?)
    }

    /// Replaces every stored application row with `rows`.
    pub fn save_dataset(&self, rows: &[ApplicationRow]) -> InventoryResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = sql::delete_application_data(&tx)?;
        for row in rows {
            sql::insert_application_row(
                &tx,
                &row.instance_id,
                &row.instance_name,
                &row.script_version,
                &row.app_name,
                &row.app_type,
                &row.app_status,
                &row.app_image,
                &row.ports,
                &row.pids,
                &row.process_name,
                &row.container_id,
            )?;
        }
        tx.commit()?;
        info!(saved = rows.len(), replaced = removed, db_fs_path = %self.db_fs_path, "dataset saved");
        Ok(rows.len())
    }

    pub fn load_dataset(&self) -> InventoryResult<Vec<ApplicationRow>> {
        let conn = self.lock()?;
        let mut rows = Vec::new();
        sql::application_rows(
            &conn,
            |_index,
             instance_id,
             instance_name,
             script_version,
             app_name,
             app_type,
             app_status,
             app_image,
             ports,
             pids,
             process_name,
             container_id| {
                rows.push(ApplicationRow {
                    instance_id: instance_id.unwrap_or_default(),
                    instance_name: instance_name.unwrap_or_default(),
                    script_version: script_version.unwrap_or_default(),
                    app_name: app_name.unwrap_or_default(),
                    app_type: app_type.unwrap_or_default(),
                    app_status: app_status.unwrap_or_default(),
                    app_image: app_image.unwrap_or_default(),
                    ports: canonical_list_text(ports.as_deref()),
                    pids: canonical_list_text(pids.as_deref()),
                    process_name: process_name.unwrap_or_default(),
                    container_id: container_id.unwrap_or_default(),
                });
                Ok(())
            },
        )?;
        debug!(loaded = rows.len(), "dataset loaded");
        Ok(rows)
    }

    /// Empties all three record sets. Callers own any confirmation step.
    pub fn clear_all(&self) -> InventoryResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let rows = sql::delete_application_data(&tx)?;
        let user_tables = sql::delete_user_tables(&tx)?;
        let custom_tables = sql::delete_custom_tables(&tx)?;
        tx.commit()?;
        info!(rows, user_tables, custom_tables, "store cleared");
        Ok(())
    }

    pub fn save_user_table_config(
        &self,
        table_name: &str,
        columns: &[String],
        filters: &Map<String, Value>,
        custom_columns: &Map<String, Value>,
    ) -> InventoryResult<()> {
        let columns = encode_json(&columns)?;
        let filters = encode_json(filters)?;
        let custom_columns = encode_json(custom_columns)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        sql::replace_user_table(&tx, table_name, &columns, &filters, &custom_columns)?;
        tx.commit()?;
        debug!(table_name, "user table saved");
        Ok(())
    }

    pub fn load_all_user_table_configs(&self) -> InventoryResult<Vec<UserTableConfig>> {
        let conn = self.lock()?;
        let mut configs = Vec::new();
        sql::user_tables(
            &conn,
            |_index, table_name, columns, filters, custom_columns, created_at| {
                configs.push((table_name, columns, filters, custom_columns, created_at));
                Ok(())
            },
        )?;
        configs
            .into_iter()
            .map(|(table_name, columns, filters, custom_columns, created_at)| {
                decode_user_table(table_name, columns, filters, custom_columns, created_at)
            })
            .collect()
    }

    pub fn load_user_table_config(&self, table_name: &str) -> InventoryResult<Option<UserTableConfig>> {
        Ok(self
            .load_all_user_table_configs()?
            .into_iter()
            .find(|c| c.table_name == table_name))
    }

    /// Returns whether a configuration was removed; unknown names are not an error.
    pub fn delete_user_table_config(&self, table_name: &str) -> InventoryResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = sql::delete_user_table(&tx, table_name)?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Stores `table` under `table_name`, repairing ragged rows first. The
    /// returned copy carries the stored timestamps.
    pub fn save_custom_table(&self, table_name: &str, table: &CustomTable) -> InventoryResult<CustomTable> {
        let mut saved = table.clone();
        saved.table_name = table_name.to_string();
        let repaired = saved.repair();
        if repaired > 0 {
            debug!(table_name, repaired, "custom table rows repaired before save");
        }
        let now = now_timestamp();
        let created_at = saved.created_at.clone().unwrap_or_else(|| now.clone());
        let table_data = encode_json(&StoredTableData {
            columns: saved.columns.clone(),
            data: saved
                .data
                .iter()
                .map(|row| row.iter().map(|cell| Value::String(cell.clone())).collect())
                .collect(),
            template_source: saved.template_source.clone(),
            created_at: Some(created_at.clone()),
        })?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        sql::upsert_custom_table(&tx, table_name, &table_data, &created_at, &now)?;
        let stored = sql::custom_table_timestamps(&tx, table_name)?;
        tx.commit()?;

        if let Some((stored_created_at, stored_updated_at)) = stored {
            saved.created_at = stored_created_at.or(Some(created_at));
            saved.updated_at = stored_updated_at;
        }
        debug!(table_name, rows = saved.data.len(), "custom table saved");
        Ok(saved)
    }

    pub fn load_all_custom_tables(&self) -> InventoryResult<Vec<CustomTable>> {
        let conn = self.lock()?;
        let mut stored = Vec::new();
        sql::custom_tables(&conn, |_index, table_name, table_data, created_at, updated_at| {
            stored.push((table_name, table_data, created_at, updated_at));
            Ok(())
        })?;
        stored
            .into_iter()
            .map(|(table_name, table_data, created_at, updated_at)| -> InventoryResult<CustomTable> {
                let text = table_data.unwrap_or_default();
                let decoded: StoredTableData = decode_json("table_data", &table_name, &text)?;
                let mut table = CustomTable {
                    table_name,
                    columns: decoded.columns,
                    data: decoded
                        .data
                        .iter()
                        .map(|row| row.iter().map(cell_text).collect())
                        .collect(),
                    template_source: decoded.template_source,
                    created_at: created_at.or(decoded.created_at),
                    updated_at,
                };
                table.repair();
                Ok(table)
            })
            .collect()
    }

    pub fn load_custom_table(&self, table_name: &str) -> InventoryResult<Option<CustomTable>> {
        Ok(self
            .load_all_custom_tables()?
            .into_iter()
            .find(|t| t.table_name == table_name))
    }

    /// Returns whether a table was removed; unknown names are not an error.
    pub fn delete_custom_table(&self, table_name: &str) -> InventoryResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = sql::delete_custom_table(&tx, table_name)?;
        tx.commit()?;
        Ok(removed > 0)
    }
}
