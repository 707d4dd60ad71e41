use serde_json::Value;
use std::io::{self, Write};

/// Pretty-print JSON to stdout, one document per run.
///
/// Decimals are already strings in the envelope, so the output round-trips
/// through `serde_json` without losing digits.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = serde_json::to_writer_pretty(&mut out, value)
        .map_err(io::Error::from)
        .and_then(|()| writeln!(out));
    if let Err(e) = written {
        tracing::error!(error = %e, "failed to write JSON output");
    }
}
