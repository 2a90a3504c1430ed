//! Inbound token validation
//!
//! Two token kinds, mutually exclusive per request: external identity tokens
//! from the OAuth provider and internally issued session tokens. Every
//! failure mode stays distinguishable for logs; externally they all collapse
//! to one unauthenticated outcome.

use crate::error::{AuthzError, Result};
use crate::session::SessionManager;
use dirgate_core::types::InternalSession;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// The credential carried by a decision request
#[derive(Debug, Clone)]
pub enum Credential {
    /// External identity token issued by the OAuth provider
    IdToken(String),
    /// Internally issued session token
    Session(String),
}

/// Outcome of token validation: the canonical principal, plus the embedded
/// session when the credential was a session token
#[derive(Debug, Clone)]
pub struct ValidatedPrincipal {
    /// Lowercase email; the cache key
    pub cache_key: String,
    pub session: Option<InternalSession>,
}

/// Verification material and expectations for external identity tokens
///
/// The decoding key is the injectable verification primitive: production
/// wiring loads the provider's published key, tests supply their own.
pub struct IdTokenConfig {
    pub decoding_key: DecodingKey,
    pub algorithm: Algorithm,
    pub expected_issuer: String,
    pub allowed_audiences: Vec<String>,
    pub allowed_hosted_domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdClaims {
    #[allow(dead_code)]
    sub: String,
    email: Option<String>,
    hd: Option<String>,
}

/// Validates inbound tokens and extracts the canonical principal
pub struct TokenValidator {
    id_config: IdTokenConfig,
    sessions: Arc<SessionManager>,
}

impl TokenValidator {
    pub fn new(id_config: IdTokenConfig, sessions: Arc<SessionManager>) -> Self {
        Self { id_config, sessions }
    }

    pub fn validate(&self, credential: &Credential) -> Result<ValidatedPrincipal> {
        match credential {
            Credential::IdToken(raw) => self.validate_id_token(raw),
            Credential::Session(raw) => {
                let session = self.sessions.decode(raw)?;
                Ok(ValidatedPrincipal {
                    cache_key: session.cache_key.clone(),
                    session: Some(session),
                })
            }
        }
    }

    /// Signature, issuer, audience, expiry, and optional hosted-domain checks
    fn validate_id_token(&self, raw: &str) -> Result<ValidatedPrincipal> {
        let mut validation = Validation::new(self.id_config.algorithm);
        validation.set_issuer(&[self.id_config.expected_issuer.as_str()]);
        validation.set_audience(
            &self
                .id_config
                .allowed_audiences
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>(),
        );

        let data = jsonwebtoken::decode::<IdClaims>(raw, &self.id_config.decoding_key, &validation)
            .map_err(map_jwt_error)
            .map_err(|err| {
                warn!(error = %err, "Identity token rejected");
                err
            })?;

        if let Some(expected) = &self.id_config.allowed_hosted_domain {
            if data.claims.hd.as_deref() != Some(expected.as_str()) {
                warn!(expected = %expected, "Identity token hosted domain rejected");
                return Err(AuthzError::WrongHostedDomain);
            }
        }

        let email = data
            .claims
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthzError::MalformedToken("missing email claim".to_string()))?;

        Ok(ValidatedPrincipal {
            cache_key: email.to_lowercase(),
            session: None,
        })
    }
}

/// Map jsonwebtoken failures onto the engine's taxonomy
pub(crate) fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthzError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthzError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthzError::ExpiredToken,
        ErrorKind::InvalidAudience => AuthzError::WrongAudience,
        ErrorKind::InvalidIssuer => AuthzError::WrongIssuer,
        _ => AuthzError::MalformedToken(err.to_string()),
    }
}
