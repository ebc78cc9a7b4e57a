//! Local tabular store: the guild workbook (xlsx via calamine) or a directory of CSV sheets.
//!
//! Sheets are read into a [Grid] of typed [Cell]s and parsed into records right here, so
//! nothing loosely typed travels past this module.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use calamine::Reader;
use thiserror::Error;

use crate::data::player::RosterRow;
use crate::data::unit::{UnitDefinition, UnitInstance};

pub mod roster;
pub mod units;
pub mod workbook;

pub use roster::RosterTable;
pub use units::UnitTable;
pub use workbook::{LocalTables, TablesLocation};

/// Largest guild size; also bounds the member columns read from wide sheets.
pub const MAX_PLAYERS: usize = 50;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),
    #[error("sheet '{0}' has no header row")]
    MissingHeader(String),
}

/// Problem found while parsing a sheet; the offending row or cell was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIssue {
    pub row: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn from_field(field: &str) -> Cell {
        if field.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(field.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
            Cell::Bool(b) => !b,
        }
    }

    /// Trimmed text content; `None` for blank or non-text cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Header or name text as shown in the sheet, so a numeric name survives an xlsx read.
    pub fn as_label(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        let shown = self.display();
        let trimmed = shown.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Non-negative whole number from a numeric cell or a numeric-looking text cell.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Cell::Number(f) if *f >= 0.0 && *f < u64::MAX as f64 && f.fract() == 0.0 => {
                Some(*f as u64)
            }
            Cell::Text(s) => s.trim().replace(',', "").parse().ok(),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            Cell::Number(f) => format!("{f}"),
            Cell::Bool(b) => format!("{b}"),
        }
    }
}

impl From<&calamine::Data> for Cell {
    fn from(data: &calamine::Data) -> Self {
        match data {
            calamine::Data::Empty | calamine::Data::Error(_) => Cell::Empty,
            calamine::Data::String(s) => Cell::from_field(s),
            calamine::Data::Float(f) => Cell::Number(*f),
            calamine::Data::Int(i) => Cell::Number(*i as f64),
            calamine::Data::Bool(b) => Cell::Bool(*b),
            other => Cell::Text(format!("{other:?}")),
        }
    }
}

/// A sheet as rows of cells, anchored at A1. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Grid { rows }
    }

    /// Text grid; blank strings become [Cell::Empty].
    pub fn from_text<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Grid {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|s| Cell::from_field(s.as_ref())).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

pub fn read_csv_grid(path: &Path) -> Result<Grid, TableError> {
    let file = fs::File::open(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_csv_grid_from(file)
}

pub fn read_csv_grid_from<R: std::io::Read>(reader: R) -> Result<Grid, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_field).collect());
    }
    Ok(Grid::from_rows(rows))
}

/// Read one worksheet. calamine trims leading empty rows/columns, so they are padded back
/// to keep the grid anchored at A1.
pub fn read_xlsx_grid(path: &Path, sheet: &str) -> Result<Grid, TableError> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(TableError::MissingSheet(sheet.to_string()));
    }
    let range = workbook.worksheet_range(sheet)?;
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }
    Ok(Grid::from_rows(rows))
}

pub fn write_csv_rows(path: &Path, rows: &[Vec<String>]) -> Result<(), TableError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| TableError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Read-only view of the roster table.
pub trait RosterStore {
    fn base_attributes(&self) -> &[RosterRow];

    fn names(&self) -> Vec<String> {
        self.base_attributes().iter().map(|r| r.name.clone()).collect()
    }

    fn ally_codes(&self) -> Vec<u64> {
        self.base_attributes().iter().map(|r| r.ally_code).collect()
    }

    fn find_by_name(&self, name: &str) -> Option<&RosterRow> {
        self.base_attributes().iter().find(|r| r.name == name)
    }

    fn find_by_ally_code(&self, ally_code: u64) -> Option<&RosterRow> {
        self.base_attributes().iter().find(|r| r.ally_code == ally_code)
    }
}

/// Read-only view of one per-unit table (heroes or ships). Instances come back already
/// carrying name, tags and stats.
pub trait UnitTableStore {
    fn definitions(&self) -> Vec<UnitDefinition>;

    fn all_instances_by_member(&self) -> HashMap<String, HashMap<String, UnitInstance>>;

    fn member_instances(&self, member: &str) -> HashMap<String, UnitInstance>;
}
