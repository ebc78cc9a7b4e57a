//! Output sinks: a report is a set of `(label, value)` blocks placed at fixed row offsets.
//! Writing always replaces what the sink held before.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::tables::{write_csv_rows, TableError};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write report to '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: TableError,
    },
    #[error("block at row {offset} overlaps an earlier block")]
    Overlap { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(u64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub value: CellValue,
}

impl ReportRow {
    pub fn number(label: impl Into<String>, value: u64) -> Self {
        ReportRow {
            label: label.into(),
            value: CellValue::Number(value),
        }
    }

    pub fn text(label: impl Into<String>, value: impl Into<String>) -> Self {
        ReportRow {
            label: label.into(),
            value: CellValue::Text(value.into()),
        }
    }
}

pub trait OutputSink {
    /// Drop everything previously written.
    fn clear(&mut self) -> Result<(), SinkError>;

    /// Write `rows` starting at row `offset`.
    fn write_block(&mut self, offset: usize, rows: &[ReportRow]) -> Result<(), SinkError>;

    /// Clear, then write each `(offset, rows)` block in order.
    fn replace_blocks(&mut self, blocks: &[(usize, &[ReportRow])]) -> Result<(), SinkError> {
        self.clear()?;
        for (offset, rows) in blocks {
            self.write_block(*offset, rows)?;
        }
        Ok(())
    }
}

/// Row-addressed buffer; also the backing store of [CsvSink].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    rows: BTreeMap<usize, ReportRow>,
}

impl MemorySink {
    pub fn row(&self, index: usize) -> Option<&ReportRow> {
        self.rows.get(&index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn dense(&self) -> impl Iterator<Item = Option<&ReportRow>> {
        let end = self.rows.keys().next_back().map_or(0, |last| last + 1);
        (0..end).map(|index| self.rows.get(&index))
    }

    /// Dense two-column rows from 0 to the last written one; gaps are blank cells.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.dense()
            .map(|row| match row {
                Some(row) => vec![row.label.clone(), row.value.to_string()],
                None => vec![String::new(), String::new()],
            })
            .collect()
    }

    pub fn render_tsv(&self) -> String {
        let mut out = String::new();
        for row in self.dense().flatten() {
            out.push_str(&format!("{}\t{}", row.label, row.value));
            out.push('\n');
        }
        out
    }
}

impl OutputSink for MemorySink {
    fn clear(&mut self) -> Result<(), SinkError> {
        self.rows.clear();
        Ok(())
    }

    fn write_block(&mut self, offset: usize, rows: &[ReportRow]) -> Result<(), SinkError> {
        if (offset..offset + rows.len()).any(|index| self.rows.contains_key(&index)) {
            return Err(SinkError::Overlap { offset });
        }
        for (index, row) in rows.iter().enumerate() {
            self.rows.insert(offset + index, row.clone());
        }
        Ok(())
    }
}

/// Two-column CSV file, rewritten whole on every write.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    buffer: MemorySink,
}

impl CsvSink {
    pub fn new(path: &Path) -> Self {
        CsvSink {
            path: path.to_path_buf(),
            buffer: MemorySink::default(),
        }
    }

    fn flush(&self) -> Result<(), SinkError> {
        write_csv_rows(&self.path, &self.buffer.to_rows()).map_err(|source| SinkError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl OutputSink for CsvSink {
    fn clear(&mut self) -> Result<(), SinkError> {
        self.buffer.clear()?;
        self.flush()
    }

    fn write_block(&mut self, offset: usize, rows: &[ReportRow]) -> Result<(), SinkError> {
        self.buffer.write_block(offset, rows)?;
        self.flush()?;
        info!(path = %self.path.display(), offset, rows = rows.len(), "report block written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::read_csv_grid;

    fn block() -> Vec<ReportRow> {
        vec![ReportRow::number("GP", 50000), ReportRow::text("Rey", "n/a")]
    }

    #[test]
    fn replace_overwrites_previous_content() {
        let mut sink = MemorySink::default();
        sink.write_block(10, &block()).expect("first");
        let rows = block();
        sink.replace_blocks(&[(0, &rows[..1]), (3, &rows[1..])]).expect("replace");
        assert_eq!(sink.len(), 2);
        assert!(sink.row(10).is_none());
        assert_eq!(sink.render_tsv(), "GP\t50000\nRey\tn/a\n");
        assert_eq!(sink.to_rows().len(), 4);
    }

    #[test]
    fn overlapping_blocks_are_rejected() {
        let mut sink = MemorySink::default();
        sink.write_block(0, &block()).expect("first");
        assert!(matches!(
            sink.write_block(1, &block()),
            Err(SinkError::Overlap { offset: 1 })
        ));
    }

    #[test]
    fn csv_sink_keeps_offsets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snapshot.csv");
        let mut sink = CsvSink::new(&path);
        let rows = block();
        sink.replace_blocks(&[(0, &rows[..1]), (2, &rows[1..])]).expect("write");
        let grid = read_csv_grid(&path).expect("read");
        assert_eq!(grid.cell(0, 1).as_u64(), Some(50000));
        assert_eq!(grid.cell(2, 0).as_text(), Some("Rey"));
    }
}
