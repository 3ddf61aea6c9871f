#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use iban_issuer::application::orchestrator::VerificationOrchestrator;
use iban_issuer::domain::ports::{IbanChecker, JwtCreator};
use iban_issuer::domain::transaction::{
    EntranceCode, MerchantReference, StartedTransaction, TransactionId, TransactionState,
    TransactionStatus,
};
use iban_issuer::error::{IssuerError, Result};
use iban_issuer::infrastructure::in_memory::InMemoryTokenStore;
use iban_issuer::interfaces::http::{AppState, create_router};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Gateway double returning T1/M1 on start and a settable state on status.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub state: Arc<Mutex<Option<TransactionState>>>,
    pub fail_start: Arc<AtomicBool>,
    pub start_calls: Arc<AtomicUsize>,
    pub status_calls: Arc<AtomicUsize>,
    pub languages: Arc<Mutex<Vec<String>>>,
    pub entrance_codes: Arc<Mutex<Vec<String>>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.set_state(TransactionState::Open);
        gateway
    }

    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock().unwrap() = Some(state);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IbanChecker for FakeGateway {
    async fn start_transaction(
        &self,
        entrance_code: &EntranceCode,
        language: &str,
    ) -> Result<StartedTransaction> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.languages.lock().unwrap().push(language.to_string());
        self.entrance_codes
            .lock()
            .unwrap()
            .push(entrance_code.as_str().to_string());
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(IssuerError::GatewayError("connection refused".into()));
        }
        Ok(StartedTransaction {
            transaction_id: TransactionId::new("T1"),
            merchant_reference: MerchantReference::new("M1"),
            issuer_authentication_url: "https://bank.example/auth/T1".into(),
        })
    }

    async fn get_status(
        &self,
        merchant_reference: &MerchantReference,
        transaction_id: &TransactionId,
    ) -> Result<TransactionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(merchant_reference.as_str(), "M1");
        let state = self
            .state
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(TransactionState::Open);
        let status = if state == TransactionState::Success {
            TransactionStatus {
                transaction_id: transaction_id.clone(),
                status: state,
                issuer_id: "ISSUER1".into(),
                name: "Jane Doe".into(),
                iban: "NL00BANK123".into(),
            }
        } else {
            TransactionStatus {
                transaction_id: transaction_id.clone(),
                status: state,
                issuer_id: String::new(),
                name: String::new(),
                iban: String::new(),
            }
        };
        Ok(status)
    }
}

/// Signer double recording the attributes it was asked to sign.
#[derive(Clone, Default)]
pub struct FakeJwtCreator {
    pub calls: Arc<Mutex<Vec<(String, String, String)>>>,
    pub fail: Arc<AtomicBool>,
}

impl JwtCreator for FakeJwtCreator {
    fn create_jwt(&self, full_name: &str, iban: &str, issuer_id: &str) -> Result<String> {
        self.calls.lock().unwrap().push((
            full_name.to_string(),
            iban.to_string(),
            issuer_id.to_string(),
        ));
        if self.fail.load(Ordering::SeqCst) {
            return Err(IssuerError::IssuanceError("signing key unavailable".into()));
        }
        Ok(format!("jwt-for-{}", iban))
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub store: InMemoryTokenStore,
    pub gateway: FakeGateway,
    pub jwt: FakeJwtCreator,
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryTokenStore::new();
        let gateway = FakeGateway::new();
        let jwt = FakeJwtCreator::default();
        let orchestrator = VerificationOrchestrator::new(
            Box::new(store.clone()),
            Box::new(gateway.clone()),
            Box::new(jwt.clone()),
        );
        let router = create_router(AppState::new(orchestrator), None);
        Self {
            router,
            store,
            gateway,
            jwt,
        }
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}
