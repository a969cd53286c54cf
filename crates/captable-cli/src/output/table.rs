use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_scalar, primary_rows};

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go in a Field/Value table; every array of records in
/// the result (and beside it, e.g. a cap table's ownership) gets its own table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_envelope(result, map),
            None => print_object(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_envelope(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        Value::Array(arr) => print_array_table(arr),
        other => println!("{}", format_scalar(other)),
    }

    for key in ["summary", "ownership"] {
        if let Some(extra) = envelope.get(key) {
            println!("\n{}:", key);
            match extra {
                Value::Object(m) => print_object(m),
                Value::Array(a) => print_array_table(a),
                other => println!("{}", format_scalar(other)),
            }
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn is_record_array(value: &Value) -> bool {
    matches!(value, Value::Array(a) if a.first().map_or(false, Value::is_object))
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map.iter().filter(|(_, v)| !is_record_array(v)) {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));

    for (key, val) in map.iter().filter(|(_, v)| is_record_array(v)) {
        println!("\n{}:", key);
        if let Some(rows) = primary_rows(val) {
            print_array_table(rows);
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// Like `format_scalar`, but flattens arrays and holder maps for a single cell.
fn format_value(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, format_scalar(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => format_scalar(other),
    }
}
