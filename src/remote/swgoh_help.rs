//! SWGoH.help API: password-grant sign-in, then bulk player and unit-list queries.

use std::cell::RefCell;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::data::player::PlayerData;
use crate::data::unit::{UnitDefinition, UnitDefinitions, UnitInstance, UnitKind, UnitStats};
use crate::remote::{http_client, join_url, send_json, DataProvider, RemoteError};

pub const DEFAULT_SWGOH_HELP_URL: &str = "https://api.swgoh.help";

const LANGUAGE: &str = "eng_us";
const COMBAT_TYPE_SHIP: u8 = 2;
const CATEGORY_PREFIXES: &[&str] = &["affiliation_", "profession_", "role_", "species_", "shipclass_"];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpPlayer {
    pub ally_code: u64,
    pub name: String,
    #[serde(default)]
    pub roster: Vec<HelpRosterUnit>,
    #[serde(default)]
    pub stats: Vec<HelpStat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRosterUnit {
    pub def_id: String,
    pub rarity: u8,
    pub level: u32,
    #[serde(default)]
    pub gear: u32,
    #[serde(default)]
    pub gp: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpStat {
    pub name_key: String,
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpUnitDefinition {
    pub base_id: String,
    pub name_key: String,
    #[serde(default)]
    pub combat_type: u8,
    #[serde(default)]
    pub force_alignment: u8,
    #[serde(default)]
    pub category_id_list: Vec<String>,
}

fn alignment_label(force_alignment: u8) -> &'static str {
    match force_alignment {
        2 => "Light Side",
        3 => "Dark Side",
        _ => "Neutral",
    }
}

fn category_label(category: &str) -> String {
    let trimmed = CATEGORY_PREFIXES
        .iter()
        .find_map(|prefix| category.strip_prefix(prefix))
        .unwrap_or(category);
    trimmed.replace('_', " ")
}

fn stat_value(stats: &[HelpStat], key: &str) -> u64 {
    stats
        .iter()
        .find(|stat| stat.name_key == key)
        .map(|stat| stat.value)
        .unwrap_or(0)
}

pub fn player_from_help(player: HelpPlayer) -> PlayerData {
    let mut data = PlayerData::new(
        player.ally_code,
        &player.name,
        stat_value(&player.stats, "Galactic Power:"),
        stat_value(&player.stats, "Galactic Power (Characters):"),
        stat_value(&player.stats, "Galactic Power (Ships):"),
    );
    for unit in player.roster {
        data.add_unit(UnitInstance::new(
            &unit.def_id,
            UnitStats {
                rarity: unit.rarity,
                gear_level: unit.gear,
                level: unit.level,
                power: unit.gp,
            },
        ));
    }
    data
}

pub fn definitions_from_help(units: &[HelpUnitDefinition]) -> UnitDefinitions {
    let mut definitions = UnitDefinitions::default();
    for unit in units {
        let mut tags = vec![alignment_label(unit.force_alignment).to_string()];
        tags.extend(unit.category_id_list.iter().map(|c| category_label(c)));
        if unit.combat_type == COMBAT_TYPE_SHIP {
            definitions.ships.push(UnitDefinition::new(
                &unit.base_id,
                &unit.name_key,
                &tags.join(" "),
                UnitKind::Ship,
            ));
        } else {
            definitions.heroes.push(UnitDefinition::new(
                &unit.base_id,
                &unit.name_key,
                &tags.join(" "),
                UnitKind::Hero,
            ));
        }
    }
    definitions
}

pub struct SwgohHelpClient {
    client: reqwest::blocking::Client,
    base_url: String,
    username: String,
    password: String,
    token: RefCell<Option<String>>,
}

impl SwgohHelpClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, RemoteError> {
        Ok(SwgohHelpClient {
            client: http_client()?,
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            token: RefCell::new(None),
        })
    }

    fn token(&self) -> Result<String, RemoteError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }
        let url = join_url(&self.base_url, "auth/signin");
        let form = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("grant_type", "password"),
            ("client_id", "abc"),
            ("client_secret", "123"),
        ];
        let response: TokenResponse = send_json(self.client.post(&url).form(&form), &url)
            .map_err(|err| RemoteError::Auth(err.to_string()))?;
        debug!("signed in to SWGoH.help");
        *self.token.borrow_mut() = Some(response.access_token.clone());
        Ok(response.access_token)
    }

    fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, RemoteError> {
        let token = self.token()?;
        let url = join_url(&self.base_url, path);
        send_json(self.client.post(&url).bearer_auth(token).json(&body), &url)
    }

    fn fetch_players(&self, ally_codes: &[u64]) -> Result<Vec<PlayerData>, RemoteError> {
        let players: Vec<HelpPlayer> = self.post(
            "swgoh/players",
            json!({ "allycodes": ally_codes, "language": LANGUAGE }),
        )?;
        Ok(players.into_iter().map(player_from_help).collect())
    }
}

impl DataProvider for SwgohHelpClient {
    fn name(&self) -> &'static str {
        "SWGoH.help"
    }

    fn fetch_player(&self, ally_code: u64) -> Result<PlayerData, RemoteError> {
        self.fetch_players(&[ally_code])?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Payload {
                url: join_url(&self.base_url, "swgoh/players"),
                message: format!("no player returned for ally code {ally_code}"),
            })
    }

    fn fetch_definitions(&self) -> Result<UnitDefinitions, RemoteError> {
        let units: Vec<HelpUnitDefinition> = self.post(
            "swgoh/data",
            json!({
                "collection": "unitsList",
                "language": LANGUAGE,
                "match": { "rarity": 7, "obtainable": true, "obtainableTime": 0 },
                "project": {
                    "baseId": 1, "nameKey": 1, "combatType": 1,
                    "forceAlignment": 1, "categoryIdList": 1
                }
            }),
        )?;
        let definitions = definitions_from_help(&units);
        info!(
            heroes = definitions.heroes.len(),
            ships = definitions.ships.len(),
            "pulled unit definitions from SWGoH.help"
        );
        Ok(definitions)
    }

    fn fetch_guild(&self, ally_codes: &[u64]) -> Result<Vec<PlayerData>, RemoteError> {
        if ally_codes.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_players(ally_codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::decode_payload;

    #[test]
    fn player_stats_map_to_gp_fields() {
        let players: Vec<HelpPlayer> = decode_payload(
            r#"[{"allyCode":111,"name":"Bob","level":85,
                 "roster":[{"defId":"REY","rarity":7,"level":85,"gear":13,"gp":34000,"combatType":1}],
                 "stats":[{"nameKey":"Galactic Power:","value":50000},
                          {"nameKey":"Galactic Power (Characters):","value":30000},
                          {"nameKey":"Galactic Power (Ships):","value":20000}]}]"#,
            "fixture",
        )
        .expect("fixture");
        let player = players.into_iter().next().map(player_from_help).expect("one player");
        assert_eq!(player.ally_code, 111);
        assert_eq!((player.gp, player.heroes_gp, player.ships_gp), (50000, 30000, 20000));
        assert_eq!(player.units["REY"].stats_string(), "7* G13 L85 P34000");
    }

    #[test]
    fn unit_list_splits_by_combat_type() {
        let units: Vec<HelpUnitDefinition> = decode_payload(
            r#"[{"baseId":"REY","nameKey":"Rey","combatType":1,"forceAlignment":2,
                  "categoryIdList":["affiliation_jedi","role_attacker"]},
                 {"baseId":"HOUNDSTOOTH","nameKey":"Hound's Tooth","combatType":2,"forceAlignment":3,
                  "categoryIdList":["shipclass_cargo_ship"]}]"#,
            "fixture",
        )
        .expect("fixture");
        let defs = definitions_from_help(&units);
        assert_eq!(defs.heroes.len(), 1);
        assert_eq!(defs.ships.len(), 1);
        assert_eq!(defs.heroes[0].tags, "light side jedi attacker");
        assert_eq!(defs.ships[0].tags, "dark side cargo ship");
    }
}
