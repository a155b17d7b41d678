use std::io;

use serde_json::{json, Map};

use crate::session::TableStructure;
use crate::storage::csv::CsvWriter;
use crate::storage::dataset::{Dataset, Value};

pub fn render_table(dataset: &Dataset) -> String {
    if dataset.row_count() == 0 {
        return "(0 rows)\n".to_string();
    }

    // Calculate column widths
    let widths: Vec<usize> = dataset
        .schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let header_width = col.name.len();
            let max_value_width = dataset
                .rows
                .iter()
                .map(|row| row.values.get(i).map(|v| v.to_string().len()).unwrap_or(0))
                .max()
                .unwrap_or(0);
            header_width.max(max_value_width)
        })
        .collect();

    let mut out = String::new();

    let header: Vec<String> = dataset
        .schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{:width$}", col.name, width = widths[i]))
        .collect();
    out.push_str(&header.join(" | "));
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&sep.join("-+-"));
    out.push('\n');

    for row in &dataset.rows {
        let values: Vec<String> = row
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:width$}", v.to_string(), width = widths[i]))
            .collect();
        out.push_str(&values.join(" | "));
        out.push('\n');
    }

    out.push_str(&format!("({} rows)\n", dataset.row_count()));
    out
}

pub fn render_csv(dataset: &Dataset) -> io::Result<String> {
    let mut out = Vec::new();
    CsvWriter::new().write_to(dataset, &mut out)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => json!(n),
        Value::Float(n) => json!(n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Blob(_) => serde_json::Value::String(value.to_string()),
    }
}

pub fn render_json(dataset: &Dataset) -> String {
    let rows: Vec<serde_json::Value> = dataset
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, serde_json::Value> = dataset
                .schema
                .columns
                .iter()
                .zip(row.values.iter())
                .map(|(col, val)| (col.name.clone(), value_to_json(val)))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();

    format!("{}\n", serde_json::Value::Array(rows))
}

/// Table name, then one line per column with its position, declared type and
/// any `PRIMARY KEY` / `NOT NULL` constraint.
pub fn render_structure(tables: &[TableStructure]) -> String {
    if tables.is_empty() {
        return "(no tables)\n".to_string();
    }

    let mut out = String::new();
    for table in tables {
        out.push_str(&format!("Table: {}\n", table.name));
        for (i, column) in table.columns.iter().enumerate() {
            let mut attrs = vec![column.declared_type.as_str()];
            if column.primary_key {
                attrs.push("PRIMARY KEY");
            }
            if column.not_null {
                attrs.push("NOT NULL");
            }
            out.push_str(&format!(
                "  Field {}: {} ({})\n",
                i + 1,
                column.name,
                attrs.join(", ")
            ));
        }
    }
    out
}
