//! Guild configuration: which provider to use, the active event filters and where the local
//! tables live. Read from YAML, then overridden by `DATACRON_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::exclusions::EmptyKeyPolicy;
use crate::remote::swgoh_gg::DEFAULT_SWGOH_GG_URL;
use crate::remote::swgoh_help::DEFAULT_SWGOH_HELP_URL;
use crate::remote::DataSource;
use crate::tables::{TablesLocation, MAX_PLAYERS};

pub const DEFAULT_CONFIG_PATH: &str = "data/datacron.yaml";

pub const ENV_DATA_SOURCE: &str = "DATACRON_DATA_SOURCE";
pub const ENV_TABLES: &str = "DATACRON_TABLES";
pub const ENV_EVENT: &str = "DATACRON_EVENT";
pub const ENV_TAG: &str = "DATACRON_TAG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value for {key}: {message}")]
    Override { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwgohGgSettings {
    pub base_url: String,
    pub guild_id: Option<u64>,
}

impl Default for SwgohGgSettings {
    fn default() -> Self {
        SwgohGgSettings {
            base_url: DEFAULT_SWGOH_GG_URL.to_string(),
            guild_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwgohHelpSettings {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SwgohHelpSettings {
    fn default() -> Self {
        SwgohHelpSettings {
            base_url: DEFAULT_SWGOH_HELP_URL.to_string(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    pub data_source: DataSource,
    /// Alignment or event name; also selects the tracked-unit column.
    pub event: String,
    pub character_tag: String,
    pub required_hero_gp: u64,
    pub member_count: usize,
    /// CSV directory, or an `.xlsx` workbook.
    pub tables: PathBuf,
    pub exclusion_policy: EmptyKeyPolicy,
    pub swgoh_gg: SwgohGgSettings,
    pub swgoh_help: SwgohHelpSettings,
}

impl Default for GuildConfig {
    fn default() -> Self {
        GuildConfig {
            data_source: DataSource::default(),
            event: "Light Side".to_string(),
            character_tag: String::new(),
            required_hero_gp: 0,
            member_count: MAX_PLAYERS,
            tables: PathBuf::from("data"),
            exclusion_policy: EmptyKeyPolicy::default(),
            swgoh_gg: SwgohGgSettings::default(),
            swgoh_help: SwgohHelpSettings::default(),
        }
    }
}

impl GuildConfig {
    /// Apply `DATACRON_*` overrides. `lookup` is `std::env::var` in the binary and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_DATA_SOURCE) {
            self.data_source = raw.parse().map_err(|message| ConfigError::Override {
                key: ENV_DATA_SOURCE,
                message,
            })?;
        }
        if let Some(raw) = lookup(ENV_TABLES) {
            self.tables = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(ENV_EVENT) {
            self.event = raw;
        }
        if let Some(raw) = lookup(ENV_TAG) {
            self.character_tag = raw;
        }
        Ok(())
    }

    pub fn tables_location(&self) -> TablesLocation {
        TablesLocation::from_path(&self.tables)
    }
}

/// Load config from `path`, or from [DEFAULT_CONFIG_PATH] when none is given.
/// A missing default file means defaults; a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<GuildConfig, ConfigError> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    if !explicit && !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(GuildConfig::default());
    }
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(GuildConfig::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Read-only view of the active settings.
pub trait ConfigurationProvider {
    fn data_source(&self) -> DataSource;
    fn current_event(&self) -> &str;
    fn tag_filter(&self) -> &str;
    fn required_hero_gp(&self) -> u64;
    fn member_count(&self) -> usize;
}

impl ConfigurationProvider for GuildConfig {
    fn data_source(&self) -> DataSource {
        self.data_source
    }

    fn current_event(&self) -> &str {
        &self.event
    }

    fn tag_filter(&self) -> &str {
        &self.character_tag
    }

    fn required_hero_gp(&self) -> u64 {
        self.required_hero_gp
    }

    fn member_count(&self) -> usize {
        self.member_count.min(MAX_PLAYERS)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("datacron.yaml");
        fs::write(
            &path,
            "data_source: SWGoH.help\nrequired_hero_gp: 30000\nexclusion_policy: unit_keys\nswgoh_help:\n  username: bob\n",
        )
        .expect("write");

        let config = load_config(Some(&path)).expect("load");
        assert!(config.data_source().is_swgoh_help());
        assert_eq!(config.required_hero_gp(), 30000);
        assert_eq!(config.exclusion_policy, EmptyKeyPolicy::UnitKeys);
        assert_eq!(config.swgoh_help.username.as_deref(), Some("bob"));
        assert_eq!(config.swgoh_help.base_url, DEFAULT_SWGOH_HELP_URL);
        assert_eq!(config.current_event(), "Light Side");
        assert_eq!(config.member_count(), 50);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DATA_SOURCE, "swgoh_help"),
            (ENV_TABLES, "guild.xlsx"),
            (ENV_TAG, "Jedi"),
        ]);
        let mut config = GuildConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .expect("overrides");
        assert_eq!(config.data_source, DataSource::SwgohHelp);
        assert_eq!(config.tag_filter(), "Jedi");
        assert!(matches!(config.tables_location(), TablesLocation::Workbook(_)));
    }

    #[test]
    fn bad_data_source_override_is_rejected() {
        let mut config = GuildConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_DATA_SOURCE).then(|| "scorpio".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Override { key: ENV_DATA_SOURCE, .. }));
    }
}
