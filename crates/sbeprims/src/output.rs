use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One-line JSON, or indented for `pretty`.
pub fn print_json<T: Serialize>(value: &T, format: OutputFormat) {
    let rendered = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
        _ => serde_json::to_string(value),
    };
    println!("{}", rendered.unwrap_or_else(|_| "{}".to_string()));
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// Flatten a decoded body into `(path, value)` rows, e.g. `legs[1].qty`.
pub fn flatten(prefix: &str, value: &Value, rows: &mut Vec<Vec<String>>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                let path = match prefix.is_empty() {
                    true => key.clone(),
                    false => format!("{prefix}.{key}"),
                };
                flatten(&path, item, rows);
            }
        }
        Value::Array(items) if items.iter().any(|item| item.is_object()) => {
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{i}]"), item, rows);
            }
        }
        Value::String(text) => rows.push(vec![prefix.to_string(), text.clone()]),
        other => rows.push(vec![prefix.to_string(), other.to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_groups_with_indices() {
        let mut rows = Vec::new();
        flatten(
            "",
            &json!({ "id": 7, "legs": [{ "qty": 1 }, { "qty": 2 }], "tags": ["A"], "note": "hi" }),
            &mut rows,
        );
        assert_eq!(
            rows,
            vec![
                vec!["id".to_string(), "7".to_string()],
                vec!["legs[0].qty".to_string(), "1".to_string()],
                vec!["legs[1].qty".to_string(), "2".to_string()],
                vec!["note".to_string(), "hi".to_string()],
                vec!["tags".to_string(), "[\"A\"]".to_string()],
            ]
        );
    }
}
