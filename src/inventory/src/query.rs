use serde::{Deserialize, Serialize};

use crate::model::{ApplicationRow, Field};

/// Fields consulted by a search box when the caller does not configure any.
pub const DEFAULT_SEARCH_FIELDS: [Field; 3] = [Field::AppName, Field::AppType, Field::InstanceName];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every row; the identity of [`Predicate::And`].
    All,
    Equals { field: Field, value: String },
    /// Field value is any of `values`; an empty set matches nothing.
    OneOf { field: Field, values: Vec<String> },
    /// Case-insensitive substring match against any of `fields`.
    Search { term: String, fields: Vec<Field> },
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(field: Field, value: impl Into<String>) -> Self {
        Predicate::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn one_of(field: Field, values: Vec<String>) -> Self {
        Predicate::OneOf { field, values }
    }

    pub fn search(term: impl Into<String>) -> Self {
        Predicate::Search {
            term: term.into(),
            fields: DEFAULT_SEARCH_FIELDS.to_vec(),
        }
    }

    pub fn search_in(term: impl Into<String>, fields: Vec<Field>) -> Self {
        Predicate::Search {
            term: term.into(),
            fields,
        }
    }

    /// Combines an optional search term with field equality filters, all of
    /// which must hold. Blank terms are ignored.
    pub fn from_parts(
        search: Option<&str>,
        search_fields: &[Field],
        equals: &[(Field, String)],
    ) -> Self {
        let mut parts = Vec::new();
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let fields = if search_fields.is_empty() {
                DEFAULT_SEARCH_FIELDS.to_vec()
            } else {
                search_fields.to_vec()
            };
            parts.push(Predicate::search_in(term, fields));
        }
        parts.extend(
            equals
                .iter()
                .map(|(field, value)| Predicate::equals(*field, value.clone())),
        );
        match parts.len() {
            0 => Predicate::All,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    pub fn matches(&self, row: &ApplicationRow) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Equals { field, value } => row.get(*field) == value,
            Predicate::OneOf { field, values } => {
                let actual = row.get(*field);
                values.iter().any(|v| v == actual)
            }
            Predicate::Search { term, fields } => {
                let needle = term.to_lowercase();
                fields
                    .iter()
                    .any(|field| row.get(*field).to_lowercase().contains(&needle))
            }
            Predicate::And(parts) => parts.iter().all(|p| p.matches(row)),
        }
    }
}

/// Rows satisfying `predicate`, in dataset order.
pub fn filter(rows: &[ApplicationRow], predicate: &Predicate) -> Vec<ApplicationRow> {
    rows.iter()
        .filter(|row| predicate.matches(row))
        .cloned()
        .collect()
}

/// Parses `field=value` as given on a command line or in a saved filter.
pub fn parse_equals(text: &str) -> Result<(Field, String), String> {
    let (field, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", text))?;
    Ok((field.parse()?, value.to_string()))
}
