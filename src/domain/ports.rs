use super::transaction::{
    EntranceCode, MerchantReference, StartedTransaction, TransactionId, TransactionStatus,
};
use crate::error::Result;
use async_trait::async_trait;

/// Correlation storage between gateway transaction ids and merchant references.
///
/// Implementations must be safe to share between concurrent requests. A missing key is
/// always reported as `IssuerError::NotFound`, regardless of backend.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Inserts a correlation, overwriting any previous value for the id.
    async fn store(
        &self,
        transaction_id: &TransactionId,
        merchant_reference: &MerchantReference,
    ) -> Result<()>;
    async fn retrieve(&self, transaction_id: &TransactionId) -> Result<MerchantReference>;
    /// Deletes a correlation. Fails with `NotFound` when it was already gone.
    async fn remove(&self, transaction_id: &TransactionId) -> Result<()>;
}

/// Banking gateway performing the actual IBAN verification.
#[async_trait]
pub trait IbanChecker: Send + Sync {
    async fn start_transaction(
        &self,
        entrance_code: &EntranceCode,
        language: &str,
    ) -> Result<StartedTransaction>;
    async fn get_status(
        &self,
        merchant_reference: &MerchantReference,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus>;
}

/// Signs verified identity attributes into a credential issuance token.
///
/// `issuer_id` is the bank identifier reported by the gateway.
pub trait JwtCreator: Send + Sync {
    fn create_jwt(&self, full_name: &str, iban: &str, issuer_id: &str) -> Result<String>;
}

pub type TokenStoreBox = Box<dyn TokenStore>;
pub type IbanCheckerBox = Box<dyn IbanChecker>;
pub type JwtCreatorBox = Box<dyn JwtCreator>;
