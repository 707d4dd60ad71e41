use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Read a typed document piped on stdin.
///
/// Returns `None` when stdin is a terminal or the pipe is empty. A document
/// opening with `{` or `[` is parsed as JSON, anything else as YAML.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = if is_json(trimmed) {
        serde_json::from_str(trimmed).map_err(|e| format!("Failed to parse stdin as JSON: {e}"))?
    } else {
        serde_yaml::from_str(trimmed).map_err(|e| format!("Failed to parse stdin as YAML: {e}"))?
    };
    tracing::debug!(bytes = trimmed.len(), "document read from stdin");
    Ok(Some(value))
}

fn is_json(document: &str) -> bool {
    document.starts_with('{') || document.starts_with('[')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_detection() {
        assert!(is_json(r#"{"cash_flows": ["-100", "110"]}"#));
        assert!(is_json("[1, 2]"));
        assert!(!is_json("projection:\n  tax_rate: \"0.21\""));
    }
}
