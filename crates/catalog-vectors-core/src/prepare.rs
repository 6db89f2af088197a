//! Record preparer: cleans a raw table into payload-safe records.
//!
//! Preparation runs in two steps over a [`RawTable`]:
//!
//! 1. every non-finite float (±infinity, NaN) in any column becomes null;
//! 2. the designated list column is run through
//!    [`normalize`](crate::normalize::normalize_traced), in place.
//!
//! All other columns are converted with
//! [`to_scalar`](crate::normalize::to_scalar). Row order is preserved
//! and no rows are dropped.

use std::collections::HashSet;

use crate::error::DatasetError;
use crate::models::{CellValue, Embedding, RawValue, Record};
use crate::normalize::{normalize_traced, to_scalar, ParseDegradation};

/// A table of raw cells with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row. The row must have one cell per column.
    pub fn push_row(&mut self, row: Vec<RawValue>) -> Result<(), DatasetError> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::RaggedRow {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Cleaned table: one record per source row, plus an optional embedding column.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTable {
    columns: Vec<String>,
    records: Vec<Record>,
    embeddings: Option<Vec<Option<Embedding>>>,
}

impl PreparedTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Materializes the record for `row`.
    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Per-row embeddings, if an embedding pass has run.
    ///
    /// A row whose source text was null has `None`.
    pub fn embeddings(&self) -> Option<&[Option<Embedding>]> {
        self.embeddings.as_deref()
    }

    /// Returns a table with the embedding column attached.
    ///
    /// Records are left untouched; the embeddings are held beside them.
    pub fn with_embeddings(self, embeddings: Vec<Option<Embedding>>) -> Self {
        debug_assert_eq!(embeddings.len(), self.records.len());
        Self {
            embeddings: Some(embeddings),
            ..self
        }
    }
}

/// Counters describing what preparation changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareStats {
    pub rows: usize,
    /// Cells (in any column) whose non-finite float was replaced by null.
    pub non_finite_replaced: usize,
    /// List-column cells that were flattened from a list into text.
    pub lists_flattened: usize,
    /// List-shaped strings kept verbatim because they did not parse.
    pub degradations: Vec<(usize, ParseDegradation)>,
}

/// Cleans `table`, normalizing `list_column` in place.
pub fn prepare(
    table: RawTable,
    list_column: &str,
) -> Result<(PreparedTable, PrepareStats), DatasetError> {
    if let Some(name) = duplicate_column(&table.columns) {
        return Err(DatasetError::DuplicateColumn(name.to_string()));
    }
    let target = table
        .column_index(list_column)
        .ok_or_else(|| DatasetError::UnknownColumn(list_column.to_string()))?;

    let mut stats = PrepareStats {
        rows: table.rows.len(),
        ..PrepareStats::default()
    };
    let RawTable { columns, rows } = table;
    let mut records = Vec::with_capacity(rows.len());

    for (row_index, row) in rows.into_iter().enumerate() {
        let mut record = Record::with_capacity(columns.len());
        for (col_index, (name, raw)) in columns.iter().zip(row).enumerate() {
            let raw = if raw.is_non_finite() {
                stats.non_finite_replaced += 1;
                RawValue::Null
            } else {
                raw
            };

            let value = if col_index == target {
                let was_list = is_list_like(&raw);
                let (value, degraded) = normalize_traced(&raw);
                if let Some(d) = degraded {
                    stats.degradations.push((row_index, d));
                } else if was_list && matches!(value, CellValue::Text(_)) {
                    stats.lists_flattened += 1;
                }
                value
            } else {
                to_scalar(&raw)
            };
            record.insert(name.clone(), value);
        }
        records.push(record);
    }

    Ok((
        PreparedTable {
            columns,
            records,
            embeddings: None,
        },
        stats,
    ))
}

fn duplicate_column(columns: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(columns.len());
    columns
        .iter()
        .find(|name| !seen.insert(name.as_str()))
        .map(String::as_str)
}

fn is_list_like(raw: &RawValue) -> bool {
    match raw {
        RawValue::List(_) | RawValue::Array(_) => true,
        RawValue::Text(s) => {
            let t = s.trim();
            t.starts_with('[') && t.ends_with(']')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn products() -> RawTable {
        let mut table = RawTable::new(vec![
            "title".to_string(),
            "price".to_string(),
            "color_options".to_string(),
        ]);
        table
            .push_row(vec![text("Phone A"), RawValue::Float(499.0), text("['red','blue']")])
            .unwrap();
        table
            .push_row(vec![text("Phone B"), RawValue::Float(f64::INFINITY), RawValue::Null])
            .unwrap();
        table
            .push_row(vec![
                text("Tablet C"),
                RawValue::Float(f64::NEG_INFINITY),
                text("['black']"),
            ])
            .unwrap();
        table
    }

    #[test]
    fn test_prepare_normalizes_list_column_in_place() {
        let (prepared, stats) = prepare(products(), "color_options").unwrap();
        let colors: Vec<CellValue> = prepared
            .records()
            .map(|r| r["color_options"].clone())
            .collect();
        assert_eq!(
            colors,
            vec![
                CellValue::Text("red, blue".to_string()),
                CellValue::Null,
                CellValue::Text("black".to_string()),
            ]
        );
        assert_eq!(stats.lists_flattened, 2);
        assert!(stats.degradations.is_empty());
        assert_eq!(prepared.columns(), &["title", "price", "color_options"]);
    }

    #[test]
    fn test_infinity_replaced_in_every_column() {
        let mut table = RawTable::new(vec!["a".to_string(), "b".to_string()]);
        table
            .push_row(vec![RawValue::Float(f64::INFINITY), RawValue::Int(1)])
            .unwrap();
        table
            .push_row(vec![RawValue::Int(2), RawValue::Float(f64::NEG_INFINITY)])
            .unwrap();

        let (prepared, stats) = prepare(table, "b").unwrap();
        assert_eq!(prepared.record(0).unwrap()["a"], CellValue::Null);
        assert_eq!(prepared.record(1).unwrap()["b"], CellValue::Null);
        assert_eq!(prepared.record(1).unwrap()["a"], CellValue::Int(2));
        assert_eq!(stats.non_finite_replaced, 2);
    }

    #[test]
    fn test_row_order_and_count_preserved() {
        let (prepared, stats) = prepare(products(), "color_options").unwrap();
        assert_eq!(prepared.len(), 3);
        assert_eq!(stats.rows, 3);
        let titles: Vec<&str> = prepared
            .records()
            .map(|r| r["title"].as_text().unwrap())
            .collect();
        assert_eq!(titles, vec!["Phone A", "Phone B", "Tablet C"]);
    }

    #[test]
    fn test_degradations_are_reported_with_row() {
        let mut table = RawTable::new(vec!["tags".to_string()]);
        table.push_row(vec![text("['ok']")]).unwrap();
        table.push_row(vec![text("[not, quoted]")]).unwrap();

        let (prepared, stats) = prepare(table, "tags").unwrap();
        assert_eq!(
            prepared.record(1).unwrap()["tags"],
            CellValue::Text("[not, quoted]".to_string())
        );
        assert_eq!(stats.degradations.len(), 1);
        assert_eq!(stats.degradations[0].0, 1);
    }

    #[test]
    fn test_unknown_list_column() {
        let err = prepare(products(), "sizes").unwrap_err();
        assert_eq!(err, DatasetError::UnknownColumn("sizes".to_string()));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let mut table = RawTable::new(vec![
            "title".to_string(),
            "tag".to_string(),
            "tag".to_string(),
        ]);
        table
            .push_row(vec![text("Phone"), text("['a']"), text("x")])
            .unwrap();
        let err = prepare(table, "tag").unwrap_err();
        assert_eq!(err, DatasetError::DuplicateColumn("tag".to_string()));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let mut table = RawTable::new(vec!["a".to_string(), "b".to_string()]);
        let err = table.push_row(vec![RawValue::Int(1)]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::RaggedRow {
                row: 0,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_with_embeddings_keeps_records() {
        let (prepared, _) = prepare(products(), "color_options").unwrap();
        let before: Vec<Record> = prepared.records().cloned().collect();
        let embedded = prepared.with_embeddings(vec![Some(vec![1.0]), None, Some(vec![0.5])]);
        let after: Vec<Record> = embedded.records().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(embedded.embeddings().unwrap()[1], None);
    }
}
