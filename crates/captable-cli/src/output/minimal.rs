use serde_json::Value;

use super::{format_scalar, result_of};

/// Headline figures by command, as dotted paths into the result object.
const PRIORITY_PATHS: [&str; 7] = [
    "waterfall.summary.total_equity",
    "summary.total_equity",
    "final_valuation",
    "shares",
    "summary.founder_ownership",
    "total_debt",
    "variable",
];

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, key| node.get(key))
}

/// Print just the key answer value from the output.
///
/// Looks for well-known headline fields first, then falls back to the first
/// field in the result object.
pub fn print_minimal(value: &Value) {
    // Cap-table output carries its summary beside the result
    let result_obj = result_of(value);

    for path in &PRIORITY_PATHS {
        let hit = lookup(result_obj, path).or_else(|| lookup(value, path));
        if let Some(val) = hit.filter(|v| !v.is_null()) {
            println!("{}", format_scalar(val));
            return;
        }
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_scalar(val));
            return;
        }
    }

    println!("{}", format_scalar(result_obj));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let v = json!({"waterfall": {"summary": {"total_equity": "90"}}});
        assert_eq!(
            lookup(&v, "waterfall.summary.total_equity"),
            Some(&json!("90"))
        );
        assert_eq!(lookup(&v, "waterfall.entries"), None);
    }
}
