use std::fs::File;
use std::io::{BufRead as _, BufReader};

use anyhow::Context;
use camino::Utf8Path;
use serde::de::DeserializeOwned;

/// Reads one JSON value per non-blank line.
pub(crate) fn read<T: DeserializeOwned>(path: &Utf8Path) -> anyhow::Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open `{path}`"))?;
    let mut values = Vec::new();

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read `{path}`"))?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line)
            .with_context(|| format!("{path}:{}: malformed line", number + 1))?;
        values.push(value);
    }

    Ok(values)
}
