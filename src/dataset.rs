//! CSV reading and writing.
//!
//! Cells are typed on load: an empty cell is null, then integer, then
//! float (`inf` and `nan` included), and anything else is text. List-like
//! strings stay text here; the preparer decides what to do with them.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use catalog_vectors_core::models::{RawValue, EMBEDDING_FIELD};
use catalog_vectors_core::prepare::{prepare, PrepareStats, PreparedTable, RawTable};

use crate::config::Config;

/// Infers the type of a single CSV cell.
pub fn parse_cell(cell: &str) -> RawValue {
    if cell.is_empty() {
        return RawValue::Null;
    }
    let trimmed = cell.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return RawValue::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return RawValue::Float(f);
    }
    RawValue::Text(cell.to_string())
}

pub fn load_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header row of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = RawTable::new(columns);
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to read row {} of {}", line, path.display()))?;
        table
            .push_row(record.iter().map(parse_cell).collect())
            .with_context(|| format!("Malformed dataset {}", path.display()))?;
    }
    info!(path = %path.display(), rows = table.rows.len(), "loaded dataset");
    Ok(table)
}

/// Writes `table` with its columns in order. Nulls are written as empty
/// cells; an attached embedding column is appended as a JSON array.
pub fn save_csv(table: &PreparedTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let embeddings = table.embeddings();

    let mut header: Vec<&str> = table.columns().iter().map(String::as_str).collect();
    if embeddings.is_some() {
        header.push(EMBEDDING_FIELD);
    }
    writer.write_record(&header)?;

    for (row, record) in table.records().enumerate() {
        let mut cells: Vec<String> = record.values().map(|v| v.to_string()).collect();
        if let Some(embeddings) = embeddings {
            let cell = match embeddings.get(row).and_then(Option::as_ref) {
                Some(vector) => serde_json::to_string(vector)?,
                None => String::new(),
            };
            cells.push(cell);
        }
        writer.write_record(&cells)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Loads and prepares the dataset named on the command line.
pub fn load_prepared(config: &Config, input: &Path) -> Result<(PreparedTable, PrepareStats)> {
    let raw = load_csv(input)?;
    let (table, stats) = prepare(raw, &config.dataset.list_column)
        .with_context(|| format!("Failed to prepare {}", input.display()))?;
    for (row, degradation) in &stats.degradations {
        warn!(
            row,
            value = %degradation.original,
            error = %degradation.error,
            "list value did not parse, kept as text"
        );
    }
    Ok((table, stats))
}

pub fn run_prepare(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let (table, stats) = load_prepared(config, input)?;
    if let Some(output) = output {
        save_csv(&table, output)?;
    }

    println!("prepare {}", input.display());
    println!("  rows: {}", stats.rows);
    println!("  non-finite values replaced: {}", stats.non_finite_replaced);
    println!("  lists flattened: {}", stats.lists_flattened);
    println!("  unparsed list values: {}", stats.degradations.len());
    if let Some(output) = output {
        println!("  written: {}", output.display());
    }
    println!("ok");
    Ok(())
}
