//! Tracked units per event: the `Events` sheet has one column per alignment/event, headed by
//! its name, listing the unit names a snapshot should report on.

use tracing::debug;

use crate::tables::{Cell, Grid};

pub const PLACEHOLDER: &str = "n/a";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    columns: Vec<(String, Vec<Cell>)>,
}

impl EventTable {
    pub fn from_grid(grid: &Grid) -> Self {
        let Some(header) = grid.rows().first() else {
            return EventTable::default();
        };
        let columns = header
            .iter()
            .enumerate()
            .filter_map(|(column, cell)| {
                let title = cell.as_text()?;
                let values = (1..grid.height())
                    .map(|row| grid.cell(row, column).clone())
                    .collect();
                Some((title.to_string(), values))
            })
            .collect();
        EventTable { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(title, _)| title.as_str())
    }

    /// Raw cells under the column whose title matches `event`, ignoring case.
    /// An unknown event yields no cells.
    pub fn column_for(&self, event: &str) -> &[Cell] {
        let event = event.trim();
        match self
            .columns
            .iter()
            .find(|(title, _)| title.eq_ignore_ascii_case(event))
        {
            Some((_, cells)) => cells.as_slice(),
            None => {
                debug!(event, "no tracked units for event");
                &[]
            }
        }
    }
}

/// Ordered `(unit name, value)` rows, unique by unit name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDefinitions {
    entries: Vec<(String, String)>,
}

impl EventDefinitions {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(entry, _)| entry == name)
    }

    /// Overwrite the value of `name`. Returns false when `name` is not tracked.
    pub fn set_value(&mut self, name: &str, value: String) -> bool {
        match self.entries.iter_mut().find(|(entry, _)| entry == name) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Keep the non-blank text cells, first occurrence only, each paired with [PLACEHOLDER].
pub fn resolve_event_definitions(cells: &[Cell]) -> EventDefinitions {
    let mut definitions = EventDefinitions::default();
    for cell in cells {
        let Some(name) = cell.as_text() else {
            continue;
        };
        if !definitions.contains(name) {
            definitions
                .entries
                .push((name.to_string(), PLACEHOLDER.to_string()));
        }
    }
    definitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blanks_dropped_and_first_occurrence_kept() {
        let cells: Vec<Cell> = ["Rey", "", "Kylo", "Rey", "Finn"]
            .into_iter()
            .map(Cell::from_field)
            .collect();
        let defs = resolve_event_definitions(&cells);
        let rows: Vec<(&str, &str)> = defs
            .rows()
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        assert_eq!(rows, vec![("Rey", "n/a"), ("Kylo", "n/a"), ("Finn", "n/a")]);
    }

    #[test]
    fn non_text_cells_are_ignored() {
        let cells = vec![Cell::Number(3.0), Cell::Bool(true), Cell::Text("Rey".into())];
        assert_eq!(resolve_event_definitions(&cells).len(), 1);
    }

    #[test]
    fn column_lookup_ignores_case() {
        let grid = Grid::from_text(&[
            vec!["Light Side", "Dark Side"],
            vec!["Rey", "Kylo Ren"],
            vec!["Finn", ""],
        ]);
        let table = EventTable::from_grid(&grid);
        assert_eq!(table.titles().collect::<Vec<_>>(), vec!["Light Side", "Dark Side"]);
        assert_eq!(resolve_event_definitions(table.column_for("light side")).len(), 2);
        assert_eq!(resolve_event_definitions(table.column_for("DARK SIDE")).len(), 1);
        assert!(table.column_for("Geonosis").is_empty());
    }

    #[test]
    fn set_value_only_touches_tracked_names() {
        let mut defs = resolve_event_definitions(&[Cell::Text("Rey".into())]);
        assert!(defs.set_value("Rey", "7* G13 L85 P34000".into()));
        assert!(!defs.set_value("Finn", "x".into()));
        assert_eq!(defs.rows()[0].1, "7* G13 L85 P34000");
    }
}
