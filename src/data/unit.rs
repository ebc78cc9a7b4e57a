//! Unit definitions (what a unit is) and unit instances (what a member owns).
//!
//! Tags are normalized to a lower-cased, single-spaced token string when a definition is
//! built, so every comparison downstream is a plain substring test against [TagFilter].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_RARITY: u8 = 7;

fn rarity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*\*").expect("rarity pattern is valid"))
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([GLP])\s*(\d+)").expect("field pattern is valid"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    #[default]
    Hero,
    Ship,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Ship => "ship",
        }
    }
}

/// Lower-case a raw tag list and collapse its whitespace.
pub fn normalize_tags(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case-insensitive substring filter over a unit's tag string. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter(String);

impl TagFilter {
    pub fn new(raw: &str) -> Self {
        TagFilter(normalize_tags(raw))
    }

    pub fn any() -> Self {
        TagFilter::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, tags: &str) -> bool {
        self.0.is_empty() || normalize_tags(tags).contains(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub base_id: String,
    pub name: String,
    pub tags: String,
    #[serde(default)]
    pub kind: UnitKind,
}

impl UnitDefinition {
    pub fn new(base_id: &str, name: &str, tags: &str, kind: UnitKind) -> Self {
        UnitDefinition {
            base_id: base_id.trim().to_string(),
            name: name.trim().to_string(),
            tags: normalize_tags(tags),
            kind,
        }
    }
}

/// Definitions as delivered by a remote directory service, split by combat type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinitions {
    pub heroes: Vec<UnitDefinition>,
    pub ships: Vec<UnitDefinition>,
}

impl UnitDefinitions {
    pub fn len(&self) -> usize {
        self.heroes.len() + self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty() && self.ships.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnitDefinition> {
        self.heroes.iter().chain(self.ships.iter())
    }

    pub fn of_kind(&self, kind: UnitKind) -> &[UnitDefinition] {
        match kind {
            UnitKind::Hero => &self.heroes,
            UnitKind::Ship => &self.ships,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized unit stats '{input}': {reason}")]
pub struct ParseStatsError {
    pub input: String,
    pub reason: &'static str,
}

/// Progression numbers of an owned unit, printed as `7* G13 L85 P34000`.
///
/// Parsing also accepts the compact table form `7*L85G13P34000`; field order after the
/// rarity does not matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub rarity: u8,
    pub gear_level: u32,
    pub level: u32,
    pub power: u64,
}

impl fmt::Display for UnitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}* G{} L{} P{}",
            self.rarity, self.gear_level, self.level, self.power
        )
    }
}

impl FromStr for UnitStats {
    type Err = ParseStatsError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseStatsError {
            input: input.to_string(),
            reason,
        };
        let rarity_match = rarity_re().captures(input).ok_or_else(|| fail("missing rarity"))?;
        let rarity: u8 = rarity_match[1]
            .parse()
            .map_err(|_| fail("rarity out of range"))?;
        if rarity == 0 || rarity > MAX_RARITY {
            return Err(fail("rarity out of range"));
        }

        let rest = &input[rarity_match[0].len()..];
        let (mut gear_level, mut level, mut power) = (None, None, None);
        for field in field_re().captures_iter(rest) {
            match &field[1] {
                "G" => gear_level = field[2].parse::<u32>().ok(),
                "L" => level = field[2].parse::<u32>().ok(),
                "P" => power = field[2].parse::<u64>().ok(),
                _ => {}
            }
        }

        Ok(UnitStats {
            rarity,
            gear_level: gear_level.ok_or_else(|| fail("missing gear level"))?,
            level: level.ok_or_else(|| fail("missing level"))?,
            power: power.ok_or_else(|| fail("missing power"))?,
        })
    }
}

/// A unit owned by one member. `name`, `tags` and `stats` are filled once the instance has
/// been matched against a [UnitDefinition]; until then it is unidentified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInstance {
    pub base_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub rarity: u8,
    pub level: u32,
    pub gear_level: u32,
    pub power: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<String>,
}

impl UnitInstance {
    pub fn new(base_id: &str, stats: UnitStats) -> Self {
        UnitInstance {
            base_id: base_id.to_string(),
            name: None,
            rarity: stats.rarity,
            level: stats.level,
            gear_level: stats.gear_level,
            power: stats.power,
            tags: None,
            stats: None,
        }
    }

    pub fn core_stats(&self) -> UnitStats {
        UnitStats {
            rarity: self.rarity,
            gear_level: self.gear_level,
            level: self.level,
            power: self.power,
        }
    }

    pub fn stats_string(&self) -> String {
        self.core_stats().to_string()
    }

    /// Attach identity and tags from the matching definition and compute the stats string.
    pub fn enrich(&mut self, definition: &UnitDefinition) {
        self.name = Some(definition.name.clone());
        self.tags = Some(definition.tags.clone());
        self.stats = Some(self.stats_string());
    }

    pub fn is_identified(&self) -> bool {
        self.name.is_some()
    }

    pub fn tags(&self) -> &str {
        self.tags.as_deref().unwrap_or("")
    }

    pub fn matches_tag(&self, filter: &TagFilter) -> bool {
        filter.matches(self.tags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rey() -> UnitDefinition {
        UnitDefinition::new("REY", "Rey", "Light Side  Jedi", UnitKind::Hero)
    }

    #[test]
    fn stats_format_and_parse_agree() {
        let stats = UnitStats {
            rarity: 7,
            gear_level: 13,
            level: 85,
            power: 34000,
        };
        let text = stats.to_string();
        assert_eq!(text, "7* G13 L85 P34000");
        assert_eq!(text.parse::<UnitStats>(), Ok(stats));
    }

    #[test]
    fn compact_table_form_parses() {
        let stats: UnitStats = "6*L80G11P21000".parse().expect("compact stats");
        assert_eq!(stats.rarity, 6);
        assert_eq!(stats.level, 80);
        assert_eq!(stats.gear_level, 11);
        assert_eq!(stats.power, 21000);
    }

    #[test]
    fn stats_without_power_or_bad_rarity_are_rejected() {
        assert!("7* G13 L85".parse::<UnitStats>().is_err());
        assert!("9* G13 L85 P1".parse::<UnitStats>().is_err());
        assert!("0* G13 L85 P1".parse::<UnitStats>().is_err());
        assert!("".parse::<UnitStats>().is_err());
    }

    #[test]
    fn tag_filter_is_case_insensitive_substring() {
        let tags = "light side jedi";
        assert!(TagFilter::new("Jedi").matches(tags));
        assert!(TagFilter::new("LIGHT SIDE").matches(tags));
        assert!(!TagFilter::new("Sith").matches(tags));
        assert!(TagFilter::any().matches(tags));
        assert!(TagFilter::new("   ").matches(""));
    }

    #[test]
    fn definition_tags_are_normalized() {
        assert_eq!(rey().tags, "light side jedi");
    }

    #[test]
    fn enrich_fills_identity_and_stats() {
        let mut unit = UnitInstance::new(
            "REY",
            UnitStats {
                rarity: 7,
                gear_level: 13,
                level: 85,
                power: 34000,
            },
        );
        assert!(!unit.is_identified());
        unit.enrich(&rey());
        assert!(unit.is_identified());
        assert_eq!(unit.name.as_deref(), Some("Rey"));
        assert_eq!(unit.stats.as_deref(), Some("7* G13 L85 P34000"));
        assert!(unit.matches_tag(&TagFilter::new("jedi")));
    }
}
