use crate::domain::transaction::TransactionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IssuerError {
    #[error("no correlation found for transaction {0}")]
    NotFound(TransactionId),
    #[error("token storage unavailable: {0}")]
    BackendUnavailable(String),
    #[error("iban gateway error: {0}")]
    GatewayError(String),
    #[error("credential issuance failed: {0}")]
    IssuanceError(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, IssuerError>;

#[cfg(feature = "storage-redis")]
impl From<redis::RedisError> for IssuerError {
    fn from(err: redis::RedisError) -> Self {
        IssuerError::BackendUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for IssuerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IssuerError::GatewayError(format!("request timed out: {}", err))
        } else {
            IssuerError::GatewayError(err.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for IssuerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        IssuerError::IssuanceError(err.to_string())
    }
}
