// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort CSV projection of raw transactions.
//!
//! Each transaction object is flattened one level deep: nested objects become
//! `parent.child` columns and anything deeper is kept as JSON text. The CSV
//! header is the union of all columns in first-seen order.
//!
//! When two fields flatten to the same name (a literal `"a.b"` key next to
//! `{"a": {"b": ..}}`), the later one is written as `a.b (2)`, then `a.b (3)`.

use crate::error::AppError;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Column used when a transaction is not a JSON object.
pub const VALUE_COLUMN: &str = "value";

const ARRAY_SEPARATOR: &str = "; ";

/// Flatten one transaction into `(column, cell)` pairs.
///
/// Column names are unique within the returned row.
pub fn flatten_transaction(tx: &Value) -> Vec<(String, String)> {
    let Value::Object(fields) = tx else {
        return vec![(VALUE_COLUMN.to_string(), cell(tx))];
    };

    let mut out = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        match value {
            Value::Object(nested) => flatten_nested(key, nested, &mut out),
            other => out.push((key.clone(), cell(other))),
        }
    }
    unique_columns(out)
}

fn unique_columns(row: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut used = HashSet::with_capacity(row.len());
    row.into_iter()
        .map(|(column, value)| {
            let mut name = column.clone();
            let mut n = 1;
            while used.contains(&name) {
                n += 1;
                name = format!("{} ({})", column, n);
            }
            used.insert(name.clone());
            (name, value)
        })
        .collect()
}

fn flatten_nested(parent: &str, nested: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, value) in nested {
        out.push((format!("{}.{}", parent, key), cell(value)));
    }
}

/// Render a value as a single cell without further flattening.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(cell)
            .collect::<Vec<_>>()
            .join(ARRAY_SEPARATOR),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Flattened rows plus the union header, ready for display or CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_transactions(transactions: &[Value]) -> Self {
        let flattened: Vec<Vec<(String, String)>> =
            transactions.iter().map(flatten_transaction).collect();

        let mut headers: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in &flattened {
            for (column, _) in row {
                if !index.contains_key(column) {
                    index.insert(column.clone(), headers.len());
                    headers.push(column.clone());
                }
            }
        }

        let rows = flattened
            .into_iter()
            .map(|row| {
                let mut cells = vec![String::new(); headers.len()];
                for (column, value) in row {
                    if let Some(&i) = index.get(&column) {
                        cells[i] = value;
                    }
                }
                cells
            })
            .collect();

        Self { headers, rows }
    }
}

/// Serialize transactions as CSV text.
pub fn transactions_to_csv(transactions: &[Value]) -> Result<String, AppError> {
    let table = Table::from_transactions(transactions);
    let mut writer = csv::Writer::from_writer(Vec::new());

    if !table.headers.is_empty() {
        writer.write_record(&table.headers).map_err(csv_error)?;
    }
    for row in &table.rows {
        writer.write_record(row).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("CSV is not UTF-8: {}", e)))
}

/// Download name such as `transactions_<uid>_2024-01-01.csv`.
pub fn csv_filename(uid: &str, date_from: NaiveDate) -> String {
    let safe_uid: String = uid
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("transactions_{}_{}.csv", safe_uid, date_from.format("%Y-%m-%d"))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("CSV write failed: {}", e))
}
