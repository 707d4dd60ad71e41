use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as a table using the tabled crate.
///
/// Scalars go into a Field/Value table; arrays of objects (scenario rows,
/// projected years) and nested objects (pro forma, break-even) each get a
/// sub-table of their own underneath.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(None, map);
            }
        }
        Value::Array(arr) => print_array_table(None, arr),
        _ => println!("{}", format_value(value)),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(None, res_map),
        Value::Array(arr) => print_array_table(None, arr),
        other => println!("{}", format_value(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(title: Option<&str>, map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&str, &Value)> = Vec::new();

    for (key, val) in map {
        if is_nested(val) {
            nested.push((key.as_str(), val));
        } else {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
    }

    if let Some(t) = title {
        println!("\n{}:", t);
    }
    println!("{}", Table::from(builder));

    for (key, val) in nested {
        match val {
            Value::Object(m) => print_object(Some(key), m),
            Value::Array(arr) => print_array_table(Some(key), arr),
            _ => {}
        }
    }
}

/// Objects and arrays of objects render as their own table.
fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(m) => !is_estimated(m),
        Value::Array(arr) => matches!(arr.first(), Some(Value::Object(_))),
        _ => false,
    }
}

fn is_estimated(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key("value") && map.contains_key("estimated")
}

fn print_array_table(title: Option<&str>, arr: &[Value]) {
    if let Some(t) = title {
        println!("\n{}:", t);
    }
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

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "N/A".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) if is_estimated(map) => {
            let v = map.get("value").map(format_value).unwrap_or_default();
            if map.get("estimated") == Some(&Value::Bool(true)) {
                format!("{} (est.)", v)
            } else {
                v
            }
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_renders_as_na() {
        assert_eq!(format_value(&Value::Null), "N/A");
    }

    #[test]
    fn test_estimated_is_flagged() {
        let v = json!({ "value": "22833000", "estimated": true });
        assert_eq!(format_value(&v), "22833000 (est.)");
        let v = json!({ "value": "23000000", "estimated": false });
        assert_eq!(format_value(&v), "23000000");
    }

    #[test]
    fn test_scenario_rows_are_nested() {
        assert!(is_nested(&json!([{ "scenario_name": "Base" }])));
        assert!(!is_nested(&json!(["-100", "110"])));
        assert!(!is_nested(&json!({ "value": "1", "estimated": true })));
    }
}
