use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    // Try to extract the "result" envelope
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    // Priority list of key output fields. A null answer is still the answer.
    let priority_keys = [
        "expected_irr",
        "irr",
        "base_case_irr",
        "threshold",
        "transaction_value",
        "free_cash_flow",
        "cash_flows",
        "expected",
        "scenarios",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                println!("{}", format_minimal(val));
                return;
            }
        }

        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    // Not an object, just print directly
    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "N/A".to_string(),
        Value::Object(map) => match map.get("value") {
            // Estimated<T> prints its value, flagged
            Some(v) if map.get("estimated") == Some(&Value::Bool(true)) => {
                format!("{} (estimated)", format_minimal(v))
            }
            Some(v) => format_minimal(v),
            None => serde_json::to_string(value).unwrap_or_default(),
        },
        Value::Array(arr) => arr.iter().map(format_minimal).collect::<Vec<_>>().join(","),
    }
}
