//! `--args` payload loading for the `call` command.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;

/// Accepts inline JSON, `@path`, or a path to an existing file.
/// A missing or blank payload is `{}`.
pub fn parse_args_payload(arg: Option<&str>) -> Result<Value> {
    let Some(arg) = arg.filter(|a| !a.trim().is_empty()) else {
        return Ok(json!({}));
    };

    if let Some(path) = arg.strip_prefix('@') {
        return read_json_file(Path::new(path));
    }

    let path = Path::new(arg);
    if path.is_file() {
        return read_json_file(path);
    }

    serde_json::from_str(arg).with_context(|| format!("--args is not valid JSON: {}", arg))
}

fn read_json_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}
