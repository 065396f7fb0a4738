use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::TagnoteError;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "TAGNOTE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_TAGNOTE_KEY: &str = "tagnote";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub basic: BasicConfig,
    #[serde(default)]
    pub azure: AzureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// Shared key clients must present on every API route.
    pub tagnote_key: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:tagnote.sqlite".to_string(),
            loglevel: "info".to_string(),
            tagnote_key: DEFAULT_TAGNOTE_KEY.to_string(),
        }
    }
}

impl BasicConfig {
    /// The shipped key is public; any deployment still using it is open.
    pub fn uses_default_key(&self) -> bool {
        self.tagnote_key == DEFAULT_TAGNOTE_KEY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub base_url: Url,
    pub organization: String,
    /// Personal access token; requests go out unauthenticated when unset.
    pub token: Option<String>,
    pub proxy: Option<Url>,
    pub cache_ttl_secs: u64,
    pub retry_max_times: usize,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://dev.azure.com").expect("static url is valid"),
            organization: String::new(),
            token: None,
            proxy: None,
            cache_ttl_secs: 60,
            retry_max_times: 3,
        }
    }
}

impl Config {
    /// Defaults, then `config.toml` (or `$TAGNOTE_CONFIG`), then `TAGNOTE_*` env vars.
    ///
    /// Nested keys use a double underscore, e.g. `TAGNOTE_AZURE__ORGANIZATION`.
    pub fn load() -> Result<Self, TagnoteError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::figment(path).extract().map_err(Into::into)
    }

    pub fn figment(path: impl Into<PathBuf>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.into()))
            .merge(Env::prefixed("TAGNOTE_").split("__"))
    }
}
