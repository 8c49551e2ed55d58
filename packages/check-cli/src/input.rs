use anyhow::{Context, Result};
use std::io::{self, Read};
use std::path::Path;

/// Read identifiers from a file, or from stdin when `path` is `-`.
pub fn read_identifiers(path: &Path) -> Result<Vec<String>> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read identifiers from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read identifiers from {}", path.display()))?
    };
    Ok(parse_identifiers(&raw))
}

/// One identifier per line. Blank lines are skipped; duplicates are kept.
pub fn parse_identifiers(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
