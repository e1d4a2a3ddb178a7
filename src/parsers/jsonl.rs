use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::utils::safe_open_file;

/// Lines of a JSONL unit that deserialized, in file order
#[derive(Debug, Default)]
pub struct JsonlLines {
    pub values: Vec<Value>,
    pub skipped: usize,
}

/// Read a JSONL session file
///
/// Malformed lines (bad JSON, invalid UTF-8) are logged and skipped; they never
/// abort the remaining lines. Only failing to open or read the file is an error.
pub fn read_jsonl_file(path: &Path) -> Result<JsonlLines> {
    let file = safe_open_file(path)?;
    let label = path.display().to_string();
    parse_jsonl(BufReader::new(file), &label)
}

/// Parse JSONL from any buffered reader; `label` names the unit in log output
pub fn parse_jsonl<R: BufRead>(reader: R, label: &str) -> Result<JsonlLines> {
    let mut lines = JsonlLines::default();

    for (line_num, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.with_context(|| format!("Failed to read line from {}", label))?;

        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                warn!(unit = label, line = line_num + 1, error = %e, "Skipping non UTF-8 line");
                lines.skipped += 1;
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => lines.values.push(value),
            Err(e) => {
                warn!(unit = label, line = line_num + 1, error = %e, "Skipping malformed JSON line");
                lines.skipped += 1;
            }
        }
    }

    if lines.skipped > 0 {
        debug!(unit = label, parsed = lines.values.len(), skipped = lines.skipped, "Parsed JSONL unit");
    }

    Ok(lines)
}
