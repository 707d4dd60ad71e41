use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// Results carrying a row set (scenario results, projected years, revenue
/// synergy scenarios) are written one row per element; anything else as
/// field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => match first_row_set(result) {
                Some(rows) => write_array_csv(&mut wtr, rows),
                None => write_pairs(&mut wtr, result),
            },
            Some(Value::Array(rows)) => write_array_csv(&mut wtr, rows),
            _ => write_pairs(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

/// First field holding a non-empty array of objects.
fn first_row_set(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    map.values().find_map(|v| match v {
        Value::Array(arr) if matches!(arr.first(), Some(Value::Object(_))) => Some(arr),
        _ => None,
    })
}

fn write_pairs(wtr: &mut csv::Writer<io::StdoutLock<'_>>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "N/A".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_set_detection() {
        let result = json!({
            "expected_irr": "12.5",
            "results": [{ "scenario_name": "Base", "irr": null }],
        });
        let map = result.as_object().unwrap();
        assert_eq!(first_row_set(map).map(|r| r.len()), Some(1));

        let flat = json!({ "irr": "10.0", "cash_flows": ["-100", "110"] });
        assert!(first_row_set(flat.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_null_is_na() {
        assert_eq!(format_csv_value(&Value::Null), "N/A");
    }
}
