use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier assigned by the banking gateway to a single verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

/// Gateway-side reference used to query the status of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantReference(String);

/// Random token sent with every check-start, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntranceCode(String);

macro_rules! string_newtype {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_newtype!(TransactionId);
string_newtype!(MerchantReference);

impl EntranceCode {
    /// Generates a fresh, unguessable entrance code.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gateway-reported state of a transaction.
///
/// Unknown values are kept verbatim so they can be reported back to the client unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionState {
    Open,
    Success,
    Failure,
    Cancelled,
    Expired,
    Other(String),
}

impl TransactionState {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionState::Open => "open",
            TransactionState::Success => "success",
            TransactionState::Failure => "failure",
            TransactionState::Cancelled => "cancelled",
            TransactionState::Expired => "expired",
            TransactionState::Other(s) => s,
        }
    }

    /// Terminal states never transition again on the gateway side.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Success
                | TransactionState::Failure
                | TransactionState::Cancelled
                | TransactionState::Expired
        )
    }
}

impl From<String> for TransactionState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "open" => TransactionState::Open,
            "success" => TransactionState::Success,
            "failure" => TransactionState::Failure,
            "cancelled" => TransactionState::Cancelled,
            "expired" => TransactionState::Expired,
            _ => TransactionState::Other(value),
        }
    }
}

impl From<TransactionState> for String {
    fn from(state: TransactionState) -> Self {
        match state {
            TransactionState::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// A transaction opened at the gateway, as returned by the start call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartedTransaction {
    pub transaction_id: TransactionId,
    pub merchant_reference: MerchantReference,
    pub issuer_authentication_url: String,
}

/// Status of a transaction. Identity fields are only populated on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub transaction_id: TransactionId,
    pub status: TransactionState,
    #[serde(default)]
    pub issuer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub iban: String,
}

impl TransactionStatus {
    pub fn is_success(&self) -> bool {
        self.status == TransactionState::Success
    }
}
