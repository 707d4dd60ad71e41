pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Render a command's result envelope in the requested format.
///
/// Warnings stay inside the envelope for `json`; `table` prints them under
/// the result, while `csv` and `minimal` carry only the figures.
pub fn format_output(format: &OutputFormat, value: &Value) {
    if let Some(n) = value.get("warnings").and_then(Value::as_array).map(Vec::len) {
        if n > 0 {
            tracing::info!(warnings = n, ?format, "result carries warnings");
        }
    }
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
