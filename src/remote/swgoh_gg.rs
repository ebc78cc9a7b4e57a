//! SWGoH.gg public API: player, guild and unit-list endpoints.
//! Units come back unenriched (base id and progression numbers only).

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::data::player::PlayerData;
use crate::data::unit::{UnitDefinition, UnitDefinitions, UnitInstance, UnitKind, UnitStats};
use crate::remote::{http_client, join_url, send_json, DataProvider, RemoteError};

pub const DEFAULT_SWGOH_GG_URL: &str = "https://swgoh.gg/api";

#[derive(Debug, Deserialize)]
pub struct GgUnit {
    pub data: GgUnitData,
}

#[derive(Debug, Deserialize)]
pub struct GgUnitData {
    pub base_id: String,
    #[serde(default)]
    pub gear_level: u32,
    pub level: u32,
    pub power: u64,
    pub rarity: u8,
}

#[derive(Debug, Deserialize)]
pub struct GgPlayerData {
    #[serde(default)]
    pub ally_code: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub galactic_power: u64,
    #[serde(default)]
    pub character_galactic_power: u64,
    #[serde(default)]
    pub ship_galactic_power: u64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct GgPlayerResponse {
    pub data: GgPlayerData,
    #[serde(default)]
    pub units: Vec<GgUnit>,
}

#[derive(Debug, Deserialize)]
pub struct GgGuildResponse {
    #[serde(default)]
    pub players: Vec<GgPlayerResponse>,
}

#[derive(Debug, Deserialize)]
pub struct GgUnitResponse {
    pub base_id: String,
    pub name: String,
    #[serde(default)]
    pub alignment: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// First run of digits in a profile URL such as `https://swgoh.gg/p/123456789/`.
pub fn ally_code_from_url(url: &str) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+)").expect("digit pattern is valid"));
    re.captures(url)?[1].parse().ok()
}

pub fn player_from_response(response: GgPlayerResponse) -> PlayerData {
    let data = response.data;
    let ally_code = data
        .ally_code
        .or_else(|| ally_code_from_url(&data.url))
        .unwrap_or_default();
    let mut player = PlayerData::new(
        ally_code,
        &data.name,
        data.galactic_power,
        data.character_galactic_power,
        data.ship_galactic_power,
    );
    for unit in response.units {
        let d = unit.data;
        player.add_unit(UnitInstance::new(
            &d.base_id,
            UnitStats {
                rarity: d.rarity,
                gear_level: d.gear_level,
                level: d.level,
                power: d.power,
            },
        ));
    }
    player
}

/// Tags are the alignment, the role and every category, space-joined and lower-cased.
pub fn definition_from_response(unit: &GgUnitResponse, kind: UnitKind) -> UnitDefinition {
    let mut parts = vec![unit.alignment.as_str(), unit.role.as_str()];
    parts.extend(unit.categories.iter().map(String::as_str));
    UnitDefinition::new(&unit.base_id, &unit.name, &parts.join(" "), kind)
}

pub struct SwgohGgClient {
    client: reqwest::blocking::Client,
    base_url: String,
    guild_id: Option<u64>,
}

impl SwgohGgClient {
    pub fn new(base_url: &str, guild_id: Option<u64>) -> Result<Self, RemoteError> {
        Ok(SwgohGgClient {
            client: http_client()?,
            base_url: base_url.to_string(),
            guild_id,
        })
    }

    fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = join_url(&self.base_url, path);
        send_json(self.client.get(&url), &url)
    }

    fn fetch_unit_list(&self, path: &str, kind: UnitKind) -> Result<Vec<UnitDefinition>, RemoteError> {
        let units: Vec<GgUnitResponse> = self.get(path)?;
        Ok(units
            .iter()
            .map(|unit| definition_from_response(unit, kind))
            .collect())
    }
}

impl DataProvider for SwgohGgClient {
    fn name(&self) -> &'static str {
        "SWGoH.gg"
    }

    fn fetch_player(&self, ally_code: u64) -> Result<PlayerData, RemoteError> {
        let response: GgPlayerResponse = self.get(&format!("player/{ally_code}/"))?;
        let mut player = player_from_response(response);
        if player.ally_code == 0 {
            player.ally_code = ally_code;
        }
        Ok(player)
    }

    fn fetch_definitions(&self) -> Result<UnitDefinitions, RemoteError> {
        let definitions = UnitDefinitions {
            heroes: self.fetch_unit_list("characters/", UnitKind::Hero)?,
            ships: self.fetch_unit_list("ships/", UnitKind::Ship)?,
        };
        info!(
            heroes = definitions.heroes.len(),
            ships = definitions.ships.len(),
            "pulled unit definitions from SWGoH.gg"
        );
        Ok(definitions)
    }

    fn fetch_guild(&self, ally_codes: &[u64]) -> Result<Vec<PlayerData>, RemoteError> {
        let Some(guild_id) = self.guild_id else {
            return ally_codes
                .iter()
                .map(|code| self.fetch_player(*code))
                .collect();
        };
        let response: GgGuildResponse = self.get(&format!("guild/{guild_id}/"))?;
        Ok(response
            .players
            .into_iter()
            .map(player_from_response)
            .collect())
    }
}
