pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Result fields that hold the main row set, in lookup order.
const ROW_KEYS: [&str; 5] = ["rounds", "entries", "points", "instruments", "ownership"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` object of an output envelope, or the value itself.
fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// The main array of row objects in a result, if it has one.
fn primary_rows(result: &Value) -> Option<&Vec<Value>> {
    match result {
        Value::Array(rows) => Some(rows),
        Value::Object(map) => ROW_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array)),
        _ => None,
    }
}

/// Scalar rendering shared by the text formatters.
fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_rows_prefers_rounds() {
        let v = json!({"result": {"rounds": [{"year": 2018}], "ownership": []}});
        let rows = primary_rows(result_of(&v)).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_primary_rows_top_level_array() {
        let v = json!({"result": [{"year": 2024}, {"year": 2025}]});
        assert_eq!(primary_rows(result_of(&v)).unwrap().len(), 2);
    }
}
