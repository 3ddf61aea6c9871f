//! JSON configuration file, loaded once at startup.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_NAMESPACE: &str = "iban-issuer";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server_config: ServerConfig,
    pub jwt_private_key_path: PathBuf,
    pub issuer_id: String,
    pub full_credential: String,
    pub cm_iban_config: CmIbanConfig,
    pub storage_type: StorageType,
    #[serde(default)]
    pub redis_config: Option<RedisConfig>,
    #[serde(default)]
    pub redis_sentinel_config: Option<RedisSentinelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the frontend build, served for every non-api path.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmIbanConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Return url for the bank redirect; `{language}` is replaced per request.
    pub return_url: String,
    pub merchant_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Memory,
    Redis,
    RedisSentinel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSentinelConfig {
    pub sentinel_host: String,
    pub sentinel_port: u16,
    #[serde(default)]
    pub password: Option<String>,
    pub master_name: String,
    #[serde(default)]
    pub sentinel_username: Option<String>,
}

impl RedisSentinelConfig {
    /// Keys are namespaced by the sentinel user, so several issuers can share one cluster.
    pub fn namespace(&self) -> String {
        self.sentinel_username
            .clone()
            .unwrap_or_else(default_namespace)
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cm_iban_config.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "cm_iban_config.timeout_ms must be greater than zero".into(),
            ));
        }
        if !self.cm_iban_config.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "CM gateway API endpoint should use https: {}",
                self.cm_iban_config.base_url
            )));
        }
        match self.storage_type {
            StorageType::Memory => {}
            StorageType::Redis => {
                self.redis_config()?;
            }
            StorageType::RedisSentinel => {
                self.redis_sentinel_config()?;
            }
        }
        Ok(())
    }

    pub fn redis_config(&self) -> Result<&RedisConfig, ConfigError> {
        self.redis_config.as_ref().ok_or_else(|| {
            ConfigError::Invalid("storage_type is redis but redis_config is missing".into())
        })
    }

    pub fn redis_sentinel_config(&self) -> Result<&RedisSentinelConfig, ConfigError> {
        self.redis_sentinel_config.as_ref().ok_or_else(|| {
            ConfigError::Invalid(
                "storage_type is redis_sentinel but redis_sentinel_config is missing".into(),
            )
        })
    }
}
