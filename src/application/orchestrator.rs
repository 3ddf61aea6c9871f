use crate::domain::ports::{IbanCheckerBox, JwtCreatorBox, TokenStoreBox};
use crate::domain::transaction::{EntranceCode, TransactionId, TransactionStatus};
use crate::error::{IssuerError, Result};

/// Result of a successful check-start.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedCheck {
    pub transaction_id: TransactionId,
    pub issuer_authentication_url: String,
}

/// Result of a status poll. `jwt` is only set when the bank check succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusOutcome {
    pub transaction_status: TransactionStatus,
    pub jwt: Option<String>,
}

/// Drives a verification from check-start to credential issuance.
///
/// The orchestrator keeps no state of its own: every poll resolves the correlation
/// through the token store, so several instances can share a networked store.
pub struct VerificationOrchestrator {
    token_store: TokenStoreBox,
    iban_checker: IbanCheckerBox,
    jwt_creator: JwtCreatorBox,
}

impl VerificationOrchestrator {
    /// Creates a new `VerificationOrchestrator`.
    ///
    /// # Arguments
    ///
    /// * `token_store` - Correlation storage, in-memory or networked.
    /// * `iban_checker` - The banking gateway.
    /// * `jwt_creator` - Signer for the issued credential.
    pub fn new(
        token_store: TokenStoreBox,
        iban_checker: IbanCheckerBox,
        jwt_creator: JwtCreatorBox,
    ) -> Self {
        Self {
            token_store,
            iban_checker,
            jwt_creator,
        }
    }

    /// Opens a gateway transaction and records its correlation.
    ///
    /// `language` ends up in the bank's return url, so only short language tags such as
    /// `nl` or `en-GB` are accepted. Nothing is stored when the gateway call fails.
    pub async fn start_check(&self, language: &str) -> Result<StartedCheck> {
        if !is_language_tag(language) {
            return Err(IssuerError::InvalidRequest(format!(
                "unsupported language {:?}",
                language
            )));
        }

        let entrance_code = EntranceCode::generate();
        let started = self
            .iban_checker
            .start_transaction(&entrance_code, language)
            .await?;

        self.token_store
            .store(&started.transaction_id, &started.merchant_reference)
            .await?;

        tracing::info!(
            transaction_id = %started.transaction_id,
            language,
            "iban check started"
        );

        Ok(StartedCheck {
            transaction_id: started.transaction_id,
            issuer_authentication_url: started.issuer_authentication_url,
        })
    }

    /// Resolves the current status of a transaction.
    ///
    /// On success a credential token is issued first and the correlation retired after,
    /// so a failed issuance can be retried by polling again.
    pub async fn poll_status(&self, transaction_id: &TransactionId) -> Result<StatusOutcome> {
        let merchant_reference = self.token_store.retrieve(transaction_id).await?;

        let status = self
            .iban_checker
            .get_status(&merchant_reference, transaction_id)
            .await?;

        if !status.is_success() {
            let state = status.status.as_str();
            if status.status.is_terminal() {
                tracing::info!(%transaction_id, state, "transaction ended without success");
            } else {
                tracing::debug!(%transaction_id, state, "transaction not finished yet");
            }
            return Ok(StatusOutcome {
                transaction_status: status,
                jwt: None,
            });
        }

        let jwt = self
            .jwt_creator
            .create_jwt(&status.name, &status.iban, &status.issuer_id)?;

        if let Err(err) = self.token_store.remove(transaction_id).await {
            if matches!(err, IssuerError::NotFound(_)) {
                tracing::warn!(%transaction_id, "transaction already retired by a concurrent poll");
            }
            return Err(err);
        }

        tracing::info!(%transaction_id, "iban verified, credential issued");
        Ok(StatusOutcome {
            transaction_status: status,
            jwt: Some(jwt),
        })
    }
}

fn is_language_tag(language: &str) -> bool {
    (2..=8).contains(&language.len())
        && language.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
}
