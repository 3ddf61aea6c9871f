use crate::domain::ports::JwtCreator;
use crate::error::{ConfigError, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

const ISSUANCE_CONTEXT: &str = "https://irma.app/ld/request/issuance/v2";
const ISSUE_REQUEST_SUBJECT: &str = "issue_request";

#[derive(Debug, Serialize)]
struct CredentialRequest<'a> {
    credential: &'a str,
    attributes: BTreeMap<&'static str, &'a str>,
}

#[derive(Debug, Serialize)]
struct IssuanceRequest<'a> {
    #[serde(rename = "@context")]
    context: &'static str,
    credentials: Vec<CredentialRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct IssuanceRequestWrapper<'a> {
    request: IssuanceRequest<'a>,
}

#[derive(Debug, Serialize)]
struct IssuanceClaims<'a> {
    iat: u64,
    iss: &'a str,
    sub: &'static str,
    iprequest: IssuanceRequestWrapper<'a>,
}

/// Signs IRMA issuance requests for the IBAN credential with an RSA key (RS256).
pub struct IrmaJwtCreator {
    key: EncodingKey,
    issuer_id: String,
    credential: String,
}

impl IrmaJwtCreator {
    pub fn new(
        private_key_pem: &[u8],
        issuer_id: impl Into<String>,
        credential: impl Into<String>,
    ) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| ConfigError::Invalid(format!("invalid jwt private key: {}", e)))?;
        Ok(Self {
            key,
            issuer_id: issuer_id.into(),
            credential: credential.into(),
        })
    }

    /// Reads the PEM encoded private key from disk.
    pub fn from_key_file(
        path: impl AsRef<Path>,
        issuer_id: impl Into<String>,
        credential: impl Into<String>,
    ) -> Result<Self> {
        let pem = std::fs::read(path.as_ref()).map_err(ConfigError::from)?;
        Self::new(&pem, issuer_id, credential)
    }
}

impl JwtCreator for IrmaJwtCreator {
    fn create_jwt(&self, full_name: &str, iban: &str, issuer_id: &str) -> Result<String> {
        let attributes =
            BTreeMap::from([("fullname", full_name), ("iban", iban), ("bic", issuer_id)]);
        let claims = IssuanceClaims {
            iat: jsonwebtoken::get_current_timestamp(),
            iss: &self.issuer_id,
            sub: ISSUE_REQUEST_SUBJECT,
            iprequest: IssuanceRequestWrapper {
                request: IssuanceRequest {
                    context: ISSUANCE_CONTEXT,
                    credentials: vec![CredentialRequest {
                        credential: &self.credential,
                        attributes,
                    }],
                },
            },
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;
        Ok(token)
    }
}
