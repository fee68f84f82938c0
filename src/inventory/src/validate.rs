use serde_json::{Map, Value};

use crate::error::{InventoryError, InventoryResult};

pub const REQUIRED_FIELDS: [&str; 3] = ["instance_id", "instance_name", "applications"];

/// A parsed instance document that passed [`validate`]. The JSON object is kept
/// exactly as parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDocument {
    document: Map<String, Value>,
}

impl ValidatedDocument {
    pub fn instance_id(&self) -> &str {
        self.str_field("instance_id").unwrap_or_default()
    }

    pub fn instance_name(&self) -> &str {
        self.str_field("instance_name").unwrap_or_default()
    }

    pub fn script_version(&self) -> Option<&str> {
        self.str_field("script_version")
    }

    /// Application entries in document order; every entry is an object with a `name`.
    pub fn applications(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.document
            .get("applications")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    pub fn application_count(&self) -> usize {
        self.applications().count()
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn into_json(self) -> Map<String, Value> {
        self.document
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }
}

fn is_non_empty_string(value: &Value) -> bool {
    value.as_str().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Parses `raw` and checks it against the instance/application shape. Every
/// schema violation found is reported together rather than only the first.
pub fn validate(raw: &[u8]) -> InventoryResult<ValidatedDocument> {
    if raw.is_empty() {
        return Err(InventoryError::EmptyInput);
    }

    let parsed: Value = serde_json::from_slice(raw)?;
    let document = match parsed {
        Value::Object(map) => map,
        _ => return Err(InventoryError::schema("document must be a JSON object")),
    };

    let mut violations = Vec::new();

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !document.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        violations.push(format!("Missing required fields: {}", missing.join(", ")));
    }

    for field in ["instance_id", "instance_name"] {
        if let Some(value) = document.get(field) {
            if !is_non_empty_string(value) {
                violations.push(format!("'{}' must be a non-empty string", field));
            }
        }
    }

    match document.get("applications") {
        None => {}
        Some(Value::Array(applications)) if applications.is_empty() => {
            violations.push("'applications' list is empty".to_string());
        }
        Some(Value::Array(applications)) => {
            for (index, app) in applications.iter().enumerate() {
                match app {
                    Value::Object(entry) if entry.contains_key("name") => {}
                    Value::Object(_) => {
                        violations.push(format!("Application {} missing 'name' field", index + 1))
                    }
                    _ => violations.push(format!("Application {} must be an object", index + 1)),
                }
            }
        }
        Some(_) => violations.push("'applications' must be a list".to_string()),
    }

    if violations.is_empty() {
        Ok(ValidatedDocument { document })
    } else {
        Err(InventoryError::Schema(violations))
    }
}
