use std::fs::OpenOptions;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::formats::FailureRecord;

/// Overwrites `path` with one URL per line.
pub fn write_urls(path: &Path, urls: &[String]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create checkpoint dir: {}", parent.display()))?;
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("create checkpoint: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for url in urls {
        out.write_all(url.as_bytes())
            .and_then(|()| out.write_all(b"\n"))
            .with_context(|| format!("write checkpoint: {}", path.display()))?;
    }
    out.flush()
        .with_context(|| format!("flush checkpoint: {}", path.display()))?;
    Ok(())
}

/// Reads a checkpoint written by [`write_urls`]. Blank lines are dropped.
pub fn read_urls(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read checkpoint: {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Appends failed units to the replay ledger.
pub fn append_failures(path: &Path, failures: &[FailureRecord]) -> anyhow::Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create failures dir: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open failures log: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for failure in failures {
        serde_json::to_writer(&mut out, failure).context("write failure record json")?;
        out.write_all(b"\n").context("write failure record newline")?;
    }
    out.flush().context("flush failures log")?;
    Ok(())
}
