//! Single-player snapshot: summary counts plus the tracked-unit rows of the current event.

use serde::Serialize;
use tracing::debug;

use crate::data::player::PlayerData;
use crate::data::unit::{TagFilter, MAX_RARITY};
use crate::report::events::EventDefinitions;
use crate::report::sink::{OutputSink, ReportRow, SinkError};

/// Row where the summary block starts.
pub const SUMMARY_ROW: usize = 0;
/// Row where the tracked-unit block starts.
pub const UNITS_ROW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCriteria {
    pub alignment: String,
    pub character_tag: String,
    pub power_threshold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    pub player: String,
    pub ally_code: u64,
    pub count_filtered: usize,
    pub count_tagged: usize,
    pub summary: Vec<ReportRow>,
    pub units: Vec<ReportRow>,
}

impl SnapshotReport {
    /// Hand both blocks to `sink`, replacing its previous content.
    pub fn write_to(&self, sink: &mut dyn OutputSink) -> Result<(), SinkError> {
        sink.replace_blocks(&[
            (SUMMARY_ROW, self.summary.as_slice()),
            (UNITS_ROW, self.units.as_slice()),
        ])
    }
}

pub struct SnapshotReporter {
    criteria: SnapshotCriteria,
    tag: TagFilter,
}

impl SnapshotReporter {
    pub fn new(criteria: SnapshotCriteria) -> Self {
        let tag = TagFilter::new(&criteria.character_tag);
        SnapshotReporter { criteria, tag }
    }

    /// Count max-rarity units at or above the power threshold (and those also carrying the
    /// character tag), and fill in the stats of every tracked unit the player owns.
    pub fn build(&self, player: &PlayerData, mut events: EventDefinitions) -> SnapshotReport {
        let threshold = self.criteria.power_threshold;
        let mut count_filtered = 0;
        let mut count_tagged = 0;

        for unit in player.units.values() {
            if unit.rarity >= MAX_RARITY && unit.power >= threshold {
                count_filtered += 1;
                if unit.matches_tag(&self.tag) {
                    count_tagged += 1;
                }
            }
            if let Some(name) = unit.name.as_deref() {
                let stats = unit.stats.clone().unwrap_or_else(|| unit.stats_string());
                events.set_value(name, stats);
            }
        }
        debug!(
            player = %player.name,
            count_filtered,
            count_tagged,
            "snapshot computed"
        );

        let summary = vec![
            ReportRow::number("GP", player.gp),
            ReportRow::number("GP Heroes", player.heroes_gp),
            ReportRow::number("GP Ships", player.ships_gp),
            ReportRow::number(
                format!("{} {MAX_RARITY}* P{threshold}+", self.criteria.alignment),
                count_filtered as u64,
            ),
            ReportRow::number(
                format!("{} {MAX_RARITY}* P{threshold}+", self.criteria.character_tag),
                count_tagged as u64,
            ),
        ];
        let units = events
            .rows()
            .iter()
            .map(|(name, value)| ReportRow::text(name.as_str(), value.as_str()))
            .collect();

        SnapshotReport {
            player: player.name.clone(),
            ally_code: player.ally_code,
            count_filtered,
            count_tagged,
            summary,
            units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::unit::{UnitDefinition, UnitInstance, UnitKind, UnitStats};
    use crate::report::events::resolve_event_definitions;
    use crate::report::sink::{CellValue, MemorySink};
    use crate::tables::Cell;

    fn owned(base_id: &str, name: &str, tags: &str, rarity: u8, power: u64) -> UnitInstance {
        let mut unit = UnitInstance::new(
            base_id,
            UnitStats {
                rarity,
                gear_level: 13,
                level: 85,
                power,
            },
        );
        unit.enrich(&UnitDefinition::new(base_id, name, tags, UnitKind::Hero));
        unit
    }

    fn criteria() -> SnapshotCriteria {
        SnapshotCriteria {
            alignment: "Light Side".into(),
            character_tag: "jedi".into(),
            power_threshold: 30000,
        }
    }

    fn events(names: &[&str]) -> EventDefinitions {
        let cells: Vec<Cell> = names.iter().map(|n| Cell::from_field(n)).collect();
        resolve_event_definitions(&cells)
    }

    #[test]
    fn counts_respect_rarity_power_and_tag() {
        let mut player = PlayerData::new(111, "Bob", 50000, 30000, 20000);
        player.add_unit(owned("REY", "Rey", "light side jedi", 7, 34000));
        player.add_unit(owned("FINN", "Finn", "light side resistance", 7, 31000));
        player.add_unit(owned("BB8", "BB-8", "light side droid", 6, 40000));
        player.add_unit(owned("POE", "Poe Dameron", "light side jedi", 7, 29999));

        let report = SnapshotReporter::new(criteria()).build(&player, events(&["Rey", "Ahsoka Tano"]));
        assert_eq!(report.count_filtered, 2);
        assert_eq!(report.count_tagged, 1);
        assert_eq!(report.summary[3].label, "Light Side 7* P30000+");
        assert_eq!(report.summary[4].label, "jedi 7* P30000+");
        assert_eq!(report.units[0], ReportRow::text("Rey", "7* G13 L85 P34000"));
        assert_eq!(report.units[1], ReportRow::text("Ahsoka Tano", "n/a"));
    }

    #[test]
    fn report_lands_in_two_blocks() {
        let mut player = PlayerData::new(111, "Bob", 50000, 30000, 20000);
        player.add_unit(owned("REY", "Rey", "light side jedi", 7, 34000));
        let report = SnapshotReporter::new(criteria()).build(&player, events(&["Rey"]));

        let mut sink = MemorySink::default();
        report.write_to(&mut sink).expect("write");
        assert_eq!(sink.row(0).map(|r| &r.value), Some(&CellValue::Number(50000)));
        assert_eq!(sink.row(4).map(|r| &r.value), Some(&CellValue::Number(1)));
        assert_eq!(sink.row(UNITS_ROW).map(|r| r.label.as_str()), Some("Rey"));
        assert_eq!(sink.len(), 6);
    }

    #[test]
    fn serializes_numbers_as_numbers() {
        let player = PlayerData::new(111, "Bob", 50000, 30000, 20000);
        let report = SnapshotReporter::new(criteria()).build(&player, EventDefinitions::default());
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["summary"][0]["value"], 50000);
        assert_eq!(json["count_tagged"], 0);
    }
}
