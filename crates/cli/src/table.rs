//! Tabular input and output for the `link` command

use anyhow::{bail, Context, Result};
use geolink_linker::LinkageReport;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Read the mention column of a CSV file with a header row.
///
/// Falls back to the only column when `column` is absent from a
/// single-column file.
pub fn read_mentions(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open input table: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header row of {}", path.display()))?
        .clone();

    let index = match headers.iter().position(|h| h.trim() == column) {
        Some(index) => index,
        None if headers.len() == 1 => 0,
        None => bail!(
            "Column {:?} not found in {} (available: {})",
            column,
            path.display(),
            headers.iter().collect::<Vec<_>>().join(", ")
        ),
    };

    let mut mentions = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("Failed to read a row of {}", path.display()))?;
        mentions.push(record.get(index).unwrap_or_default().to_string());
    }

    Ok(mentions)
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    term: &'a str,
    entity_id: String,
    status: String,
    candidates: String,
}

/// One row per term: `term,entity_id,status,candidates`
pub fn write_csv<W: Write>(report: &LinkageReport, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if report.is_empty() {
        csv.write_record(["term", "entity_id", "status", "candidates"])?;
    }
    for entry in &report.entries {
        csv.serialize(OutputRow {
            term: entry.term.as_str(),
            entity_id: entry
                .result
                .entity()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            status: entry.result.status(),
            candidates: entry
                .candidates
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// The full report as pretty JSON
pub fn write_json<W: Write>(report: &LinkageReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    Ok(())
}
