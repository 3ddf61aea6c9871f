use crate::config::CmIbanConfig;
use crate::domain::ports::IbanChecker;
use crate::domain::transaction::{
    EntranceCode, MerchantReference, StartedTransaction, TransactionId, TransactionStatus,
};
use crate::error::{ConfigError, IssuerError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Placeholder in the configured return url that is replaced by the client's language.
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

#[derive(Debug, Serialize)]
struct IbanCheckRequest<'a> {
    merchant_token: &'a str,
    entrance_code: &'a EntranceCode,
    merchant_return_url: String,
}

#[derive(Debug, Serialize)]
struct MerchantTransactionRequest<'a> {
    merchant_token: &'a str,
    transaction_id: &'a TransactionId,
    merchant_reference: &'a MerchantReference,
}

/// IBAN checker backed by the CM iDEAL gateway.
#[derive(Debug, Clone)]
pub struct CmIbanChecker {
    http: reqwest::Client,
    base_url: String,
    return_url: String,
    merchant_token: String,
}

impl CmIbanChecker {
    /// Creates a checker from configuration. The gateway must be reached over https.
    pub fn new(config: &CmIbanConfig) -> Result<Self> {
        if !config.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "CM gateway API endpoint should use https: {}",
                config.base_url
            ))
            .into());
        }
        Self::with_base_url(config, config.base_url.clone())
    }

    /// Creates a checker without the https requirement, for pointing at a local gateway.
    pub fn with_base_url(config: &CmIbanConfig, base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            return_url: config.return_url.clone(),
            merchant_token: config.merchant_token.clone(),
        })
    }

    fn return_url_for(&self, language: &str) -> String {
        self.return_url.replace(LANGUAGE_PLACEHOLDER, language)
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "calling CM gateway");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IssuerError::GatewayError(format!(
                "{} returned {}: {}",
                endpoint, status, text
            )));
        }

        response.json::<T>().await.map_err(|e| {
            IssuerError::GatewayError(format!("malformed response from {}: {}", endpoint, e))
        })
    }
}

#[async_trait]
impl IbanChecker for CmIbanChecker {
    async fn start_transaction(
        &self,
        entrance_code: &EntranceCode,
        language: &str,
    ) -> Result<StartedTransaction> {
        let request = IbanCheckRequest {
            merchant_token: &self.merchant_token,
            entrance_code,
            merchant_return_url: self.return_url_for(language),
        };
        self.post("transaction", &request).await
    }

    async fn get_status(
        &self,
        merchant_reference: &MerchantReference,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus> {
        let request = MerchantTransactionRequest {
            merchant_token: &self.merchant_token,
            transaction_id,
            merchant_reference,
        };
        self.post("status", &request).await
    }
}
