//! Per-run score files: one `MetricName: value` pair per line.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{KgError, Result};

fn score_line() -> &'static Regex {
    static SCORE_LINE: OnceLock<Regex> = OnceLock::new();
    SCORE_LINE.get_or_init(|| {
        Regex::new(r"^\s*([^:]+?)\s*:\s*(.+?)\s*$").expect("Invalid regex pattern")
    })
}

/// Parse score file content into `(name, value)` pairs in file order.
///
/// Lines without a `name: value` shape are ignored. A non-numeric value is an
/// error for the metric names listed in `strict`, and skipped otherwise.
pub fn parse_scores(content: &str, strict: &[String]) -> Result<Vec<(String, f64)>> {
    let mut scores = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let Some(cap) = score_line().captures(line) else {
            continue;
        };
        let name = &cap[1];
        let raw = &cap[2];
        match raw.parse::<f64>() {
            Ok(value) => scores.push((name.to_string(), value)),
            Err(_) if strict.iter().any(|s| s == name) => {
                return Err(KgError::Parse(format!(
                    "line {}: value '{}' for {} is not a number",
                    idx + 1,
                    raw,
                    name
                )));
            }
            Err(_) => log::debug!("Skipping non-numeric score line: {}", line),
        }
    }

    Ok(scores)
}

/// Read and parse a score file.
pub fn read_scores(path: &Path, strict: &[String]) -> Result<Vec<(String, f64)>> {
    let content = std::fs::read_to_string(path)?;
    parse_scores(&content, strict).map_err(|e| match e {
        KgError::Parse(msg) => KgError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}
