//! Application configuration, extracted from the raw process environment.

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::modules::Module;

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_sheets_requests_per_minute() -> u32 {
    300
}

fn default_sheets_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    #[serde(default = "default_sheets_base_url")]
    pub sheets_base_url: String,
    pub google_access_token: Option<String>,
    pub google_api_key: Option<String>,
    #[serde(default = "default_sheets_requests_per_minute")]
    pub sheets_requests_per_minute: u32,
    #[serde(
        default = "default_sheets_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub sheets_timeout: Duration,
    /// Overrides every dataset's own TTL when set.
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub cache_ttl: Option<Duration>,

    pub pex_spreadsheet_id: Option<String>,
    pub vendas_spreadsheet_id: Option<String>,
    pub okrs_spreadsheet_id: Option<String>,
    pub kpis_spreadsheet_id: Option<String>,
    pub gestao_rede_spreadsheet_id: Option<String>,
    pub carteira_spreadsheet_id: Option<String>,
    pub branches_spreadsheet_id: Option<String>,
    pub mercado_spreadsheet_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
            shutdown_timeout: default_shutdown_timeout(),
            sheets_base_url: default_sheets_base_url(),
            google_access_token: None,
            google_api_key: None,
            sheets_requests_per_minute: default_sheets_requests_per_minute(),
            sheets_timeout: default_sheets_timeout(),
            cache_ttl: None,
            pex_spreadsheet_id: None,
            vendas_spreadsheet_id: None,
            okrs_spreadsheet_id: None,
            kpis_spreadsheet_id: None,
            gestao_rede_spreadsheet_id: None,
            carteira_spreadsheet_id: None,
            branches_spreadsheet_id: None,
            mercado_spreadsheet_id: None,
        }
    }
}

/// Optional file read before the environment; environment values win.
pub const CONFIG_FILE: &str = "central.toml";

impl Config {
    /// Extract from [`CONFIG_FILE`] (if present) and the process environment
    /// (`PORT`, `PEX_SPREADSHEET_ID`, ...).
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw())
            .extract()
    }

    /// The spreadsheet backing `module`, if configured and non-blank.
    pub fn spreadsheet_id(&self, module: Module) -> Option<&str> {
        let id = match module {
            Module::Pex => &self.pex_spreadsheet_id,
            Module::Vendas => &self.vendas_spreadsheet_id,
            Module::Okrs => &self.okrs_spreadsheet_id,
            Module::Kpis => &self.kpis_spreadsheet_id,
            Module::GestaoRede => &self.gestao_rede_spreadsheet_id,
            Module::Carteira => &self.carteira_spreadsheet_id,
            Module::Branches => &self.branches_spreadsheet_id,
            Module::Mercado => &self.mercado_spreadsheet_id,
        };
        id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Modules with a spreadsheet configured.
    pub fn configured_modules(&self) -> Vec<Module> {
        Module::ALL
            .into_iter()
            .filter(|module| self.spreadsheet_id(*module).is_some())
            .collect()
    }
}

/// Accepts bare seconds (`30`) or a unit-suffixed string (`30s`, `5m`, `1500ms`).
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn deserialize_optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration(deserializer).map(Some)
}

pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let parsed = fundu::DurationParser::with_all_time_units()
        .parse(text.trim())
        .map_err(|e| format!("invalid duration '{text}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{text}': {e}"))
}
