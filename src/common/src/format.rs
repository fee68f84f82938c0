use std::fmt::Display;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::*;

/// Renders headers and rows as a rounded-corner terminal table.
pub fn as_ascii_table<T, U, V, W>(headers: T, rows: U) -> String
where
    T: IntoIterator,
    T::Item: AsRef<str> + Display,
    U: IntoIterator<Item = V>,
    V: IntoIterator<Item = W>,
    W: AsRef<str> + Display,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table.add_rows(rows);
    table.to_string()
}

/// Renders headers and rows as a GitHub-flavored markdown table.
pub fn as_markdown_table<T, U, V, W>(headers: T, rows: U) -> String
where
    T: IntoIterator,
    T::Item: AsRef<str> + Display,
    U: IntoIterator<Item = V>,
    V: IntoIterator<Item = W>,
    W: AsRef<str> + Display,
{
    let mut table = Table::new();
    table
        .load_preset(ASCII_MARKDOWN)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table.add_rows(rows);
    table.to_string()
}

/// Renders `key: value` pairs as a two column table, keeping the given order.
pub fn as_key_value_table<K, V>(pairs: &[(K, V)], markdown: bool) -> String
where
    K: AsRef<str> + Display,
    V: AsRef<str> + Display,
{
    let rows: Vec<Vec<String>> = pairs
        .iter()
        .map(|(k, v)| vec![k.to_string(), v.to_string()])
        .collect();
    if markdown {
        as_markdown_table(["Metric", "Value"], rows)
    } else {
        as_ascii_table(["Metric", "Value"], rows)
    }
}
