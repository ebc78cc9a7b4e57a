//! Remote game-data providers.
//!
//! Two interchangeable services (SWGoH.gg and SWGoH.help) sit behind [DataProvider]; the one
//! in use is picked by [DataSource] from configuration. Calls are blocking and are never
//! retried here: callers decide what a failure means.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::GuildConfig;
use crate::data::player::PlayerData;
use crate::data::unit::UnitDefinitions;

pub mod swgoh_gg;
pub mod swgoh_help;

pub use swgoh_gg::SwgohGgClient;
pub use swgoh_help::SwgohHelpClient;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed payload from {url}: {message}")]
    Payload { url: String, message: String },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Capability interface shared by both remote services.
pub trait DataProvider {
    fn name(&self) -> &'static str;

    /// One player's base attributes and unenriched units.
    fn fetch_player(&self, ally_code: u64) -> Result<PlayerData, RemoteError>;

    /// The full unit definition set.
    fn fetch_definitions(&self) -> Result<UnitDefinitions, RemoteError>;

    /// Every listed member. Providers with a bulk endpoint override this.
    fn fetch_guild(&self, ally_codes: &[u64]) -> Result<Vec<PlayerData>, RemoteError> {
        ally_codes
            .iter()
            .map(|code| self.fetch_player(*code))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[default]
    #[serde(rename = "SWGoH.gg", alias = "swgoh.gg", alias = "swgoh_gg")]
    SwgohGg,
    #[serde(rename = "SWGoH.help", alias = "swgoh.help", alias = "swgoh_help")]
    SwgohHelp,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SwgohGg => "SWGoH.gg",
            Self::SwgohHelp => "SWGoH.help",
        }
    }

    pub fn is_swgoh_gg(&self) -> bool {
        *self == Self::SwgohGg
    }

    pub fn is_swgoh_help(&self) -> bool {
        *self == Self::SwgohHelp
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', ".").as_str() {
            "swgoh.gg" => Ok(Self::SwgohGg),
            "swgoh.help" => Ok(Self::SwgohHelp),
            other => Err(format!("unknown data source '{other}'")),
        }
    }
}

/// Build the provider selected by configuration.
pub fn build_provider(config: &GuildConfig) -> Result<Box<dyn DataProvider>, RemoteError> {
    match config.data_source {
        DataSource::SwgohGg => Ok(Box::new(SwgohGgClient::new(
            &config.swgoh_gg.base_url,
            config.swgoh_gg.guild_id,
        )?)),
        DataSource::SwgohHelp => {
            let settings = &config.swgoh_help;
            let (Some(username), Some(password)) = (&settings.username, &settings.password) else {
                return Err(RemoteError::NotConfigured("swgoh_help credentials"));
            };
            Ok(Box::new(SwgohHelpClient::new(
                &settings.base_url,
                username,
                password,
            )?))
        }
    }
}

pub(crate) fn http_client() -> Result<reqwest::blocking::Client, RemoteError> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("datacron/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RemoteError::Client)
}

/// Send a prepared request and decode its JSON body.
pub(crate) fn send_json<T: DeserializeOwned>(
    request: reqwest::blocking::RequestBuilder,
    url: &str,
) -> Result<T, RemoteError> {
    debug!(url, "remote request");
    let response = request.send().map_err(|source| RemoteError::Request {
        url: url.to_string(),
        source,
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.text().map_err(|source| RemoteError::Request {
        url: url.to_string(),
        source,
    })?;
    decode_payload(&body, url)
}

pub(crate) fn decode_payload<T: DeserializeOwned>(body: &str, url: &str) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|err| RemoteError::Payload {
        url: url.to_string(),
        message: err.to_string(),
    })
}

/// Joins a base URL and a path without doubling or dropping the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
