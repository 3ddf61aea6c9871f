use crate::domain::ports::TokenStore;
use crate::domain::transaction::{MerchantReference, TransactionId};
use crate::error::{IssuerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A thread-safe in-process token store.
///
/// Every access, reads included, goes through a single `Mutex`. State is lost on restart,
/// so correlations for abandoned transactions live until the process exits.
#[derive(Default, Clone)]
pub struct InMemoryTokenStore {
    tokens: Arc<Mutex<HashMap<TransactionId, MerchantReference>>>,
}

impl InMemoryTokenStore {
    /// Creates a new, empty in-memory token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live correlations.
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn store(
        &self,
        transaction_id: &TransactionId,
        merchant_reference: &MerchantReference,
    ) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        tokens.insert(transaction_id.clone(), merchant_reference.clone());
        Ok(())
    }

    async fn retrieve(&self, transaction_id: &TransactionId) -> Result<MerchantReference> {
        let tokens = self.tokens.lock().await;
        tokens
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| IssuerError::NotFound(transaction_id.clone()))
    }

    async fn remove(&self, transaction_id: &TransactionId) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        tokens
            .remove(transaction_id)
            .map(|_| ())
            .ok_or_else(|| IssuerError::NotFound(transaction_id.clone()))
    }
}
