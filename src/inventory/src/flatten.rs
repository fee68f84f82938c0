use serde_json::{Map, Value};

use crate::model::{ApplicationRow, UNKNOWN};
use crate::validate::ValidatedDocument;

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn text_or(app: &Map<String, Value>, key: &str, default: &str) -> String {
    app.get(key)
        .map(scalar_text)
        .unwrap_or_else(|| default.to_string())
}

/// Joins `[80, 443]` as `"80, 443"`; absent, null or empty lists give `""`.
pub fn join_list(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Null) | None => String::new(),
        Some(other) => scalar_text(other),
    }
}

/// Emits one row per application, in document order, carrying the instance
/// fields onto every row.
pub fn flatten(document: &ValidatedDocument) -> Vec<ApplicationRow> {
    let instance_id = document.instance_id();
    let instance_name = document.instance_name();
    let script_version = document.script_version().unwrap_or(UNKNOWN);

    document
        .applications()
        .map(|app| ApplicationRow {
            instance_id: instance_id.to_string(),
            instance_name: instance_name.to_string(),
            script_version: script_version.to_string(),
            app_name: text_or(app, "name", UNKNOWN),
            app_type: text_or(app, "type", UNKNOWN),
            app_status: text_or(app, "status", UNKNOWN),
            app_image: text_or(app, "image", ""),
            ports: join_list(app.get("ports")),
            pids: join_list(app.get("pids")),
            process_name: text_or(app, "process_name", ""),
            container_id: text_or(app, "container_id", ""),
        })
        .collect()
}
