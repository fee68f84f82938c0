/**
 * Helper macros for creating type-safe functions that wrap SQLite statements in
 * Rusqlite accessors. The generated functions expect `Connection`,
 * `RusqliteResult` and `ToSql` to be in scope where the macro is invoked, and
 * use `prepare_cached` so repeated calls inside a transaction reuse the
 * prepared statement.
 */

// Macro for executing a non-query SQL command (like INSERT, UPDATE, DELETE) with type-safe bind parameters
macro_rules! execute_sql {
    ($func_name:ident, $sql:expr, $($param_name:ident : $param_type:ty),*) => {
        pub fn $func_name(conn: &Connection $(, $param_name: $param_type)*) -> RusqliteResult<usize> {
            let mut stmt = conn.prepare_cached($sql)?;
            let params = [$(&$param_name as &dyn ToSql),*];
            let affected_rows = stmt.execute(params)?;
            Ok(affected_rows)
        }
    };
}

// Macro for executing a non-query SQL command (like INSERT, UPDATE, DELETE) without bind parameters
macro_rules! execute_sql_no_args {
    ($func_name:ident, $sql:expr) => {
        pub fn $func_name(conn: &Connection) -> RusqliteResult<usize> {
            let mut stmt = conn.prepare_cached($sql)?;
            let affected_rows = stmt.execute([])?;
            Ok(affected_rows)
        }
    };
}

// Macro for executing multiple statements in a batch without any arguments
macro_rules! execute_sql_batch {
    ($func_name:ident, $sql:expr) => {
        pub fn $func_name(conn: &Connection) -> RusqliteResult<()> {
            conn.execute_batch($sql)?;
            Ok(())
        }
    };
}

// Macro for executing a query that returns at most one row with type-safe bind
// parameters; a missing row is `Ok(None)` rather than an error
macro_rules! query_sql_optional {
    ($func_name:ident, $sql:expr, $($param_name:ident : $param_type:ty),*; $($out_name:ident : $out_type:ty),+) => {
        pub fn $func_name(conn: &Connection $(, $param_name: $param_type)*) -> RusqliteResult<Option<($($out_type),+,)>> {
            let mut stmt = conn.prepare_cached($sql)?;
            let params = [$(&$param_name as &dyn ToSql),*];
            let mut rows = stmt.query(params)?;

            if let Some(row) = rows.next()? {
                Ok(Some(($(
                    row.get::<_, $out_type>(stringify!($out_name))?,
                )+)))
            } else {
                Ok(None)
            }
        }
    };
}

// Macro for executing a query SQL command that calls a closure for each row without bind parameters
macro_rules! query_sql_rows_no_args {
    ($func_name:ident, $sql:expr; $($out_name:ident : $out_type:ty),+) => {
        pub fn $func_name<F>(conn: &Connection, mut callback: F) -> RusqliteResult<()>
        where
            F: FnMut(usize, $($out_type),*) -> RusqliteResult<()>,
        {
            let mut stmt = conn.prepare_cached($sql)?;
            let mut rows = stmt.query([])?;
            let mut row_index = 0;
            while let Some(row) = rows.next()? {
                callback(row_index, $(row.get::<_, $out_type>(stringify!($out_name))?),*)?;
                row_index += 1;
            }
            Ok(())
        }
    };
}
