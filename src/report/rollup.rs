//! Guild rollup: per unit, how many members own it at each star level or better.

use std::path::Path;

use serde::Serialize;

use crate::data::exclusions::BulkUnits;
use crate::data::unit::MAX_RARITY;
use crate::tables::{write_csv_rows, TableError};

const MIN_RARITY: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollupRow {
    pub unit: String,
    /// Owners at >= 2*, >= 3*, ... >= 7*.
    pub owners_at_least: [usize; (MAX_RARITY - MIN_RARITY + 1) as usize],
}

impl RollupRow {
    pub fn owners(&self, rarity: u8) -> usize {
        if !(MIN_RARITY..=MAX_RARITY).contains(&rarity) {
            return 0;
        }
        self.owners_at_least[(rarity - MIN_RARITY) as usize]
    }
}

/// One row per unit, ordered by unit name.
pub fn guild_rollup(bulk: &BulkUnits) -> Vec<RollupRow> {
    bulk.iter()
        .map(|(unit, owners)| {
            let mut counts = [0usize; (MAX_RARITY - MIN_RARITY + 1) as usize];
            for instance in owners.values() {
                for rarity in MIN_RARITY..=instance.rarity.min(MAX_RARITY) {
                    counts[(rarity - MIN_RARITY) as usize] += 1;
                }
            }
            RollupRow {
                unit: unit.clone(),
                owners_at_least: counts,
            }
        })
        .collect()
}

pub fn rollup_rows(rows: &[RollupRow]) -> Vec<Vec<String>> {
    let mut header = vec!["Unit".to_string()];
    header.extend((MIN_RARITY..=MAX_RARITY).map(|r| format!("{r}*")));
    let mut out = vec![header];
    out.extend(rows.iter().map(|row| {
        let mut line = vec![row.unit.clone()];
        line.extend(row.owners_at_least.iter().map(usize::to_string));
        line
    }));
    out
}

pub fn write_rollup_csv(path: &Path, rows: &[RollupRow]) -> Result<(), TableError> {
    write_csv_rows(path, &rollup_rows(rows))
}
