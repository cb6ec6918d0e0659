use crate::common::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS, DEFAULT_ENRICH_CONCURRENCY, DEFAULT_ENVIRONMENT,
    DEFAULT_PORT, OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL, SEATGEEK_BASE_URL,
};
use crate::common::error::{Result, SearchError};
use crate::pipeline::cache::CachePolicy;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub seatgeek: SeatGeekConfig,
    pub openai: OpenAiConfig,
    pub enrich: EnrichConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeatGeekConfig {
    pub base_url: String,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl Default for SeatGeekConfig {
    fn default() -> Self {
        Self {
            base_url: SEATGEEK_BASE_URL.to_string(),
            client_id: None,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: OPENAI_DEFAULT_MODEL.to_string(),
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_ENRICH_CONCURRENCY,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            capacity: self.capacity,
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

impl Config {
    /// Loads `config.toml` if present, then applies environment overrides
    /// (after reading `.env`).
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = if Path::new(CONFIG_PATH).exists() {
            Self::from_file(CONFIG_PATH)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overrides fields from variables returned by `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(id) = var("SEATGEEK_CLIENT_ID") {
            self.seatgeek.client_id = Some(id);
        }
        if let Some(url) = var("SEATGEEK_BASE_URL") {
            self.seatgeek.base_url = url;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(env) = var("APP_ENV") {
            self.server.environment = env;
        }
        if let Some(port) = var("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(n) = var("ENRICH_CONCURRENCY") {
            self.enrich.concurrency = parse_var("ENRICH_CONCURRENCY", &n)?;
        }
        if let Some(n) = var("CACHE_CAPACITY") {
            self.cache.capacity = parse_var("CACHE_CAPACITY", &n)?;
        }
        if let Some(n) = var("CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_var("CACHE_TTL_SECS", &n)?;
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| SearchError::Config(format!("Invalid {}='{}': {}", name, value, e)))
}
