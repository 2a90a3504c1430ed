//! Internal session issuance and validation (HS256 JWT)

use crate::error::{AuthzError, Result};
use chrono::Utc;
use dirgate_core::types::InternalSession;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried in the signed session token
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sid: String,
    sub: String,
    email: String,
    cache_key: String,
    iat: i64,
    exp: i64,
}

impl From<&InternalSession> for SessionClaims {
    fn from(session: &InternalSession) -> Self {
        Self {
            sid: session.session_id.clone(),
            sub: session.subject.clone(),
            email: session.email.clone(),
            cache_key: session.cache_key.clone(),
            iat: session.issued_at,
            exp: session.expires_at,
        }
    }
}

impl From<SessionClaims> for InternalSession {
    fn from(claims: SessionClaims) -> Self {
        Self {
            session_id: claims.sid,
            subject: claims.sub,
            email: claims.email,
            cache_key: claims.cache_key,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// Issues and validates internal sessions signed with the service secret
///
/// Sessions carry only a pointer to the cache key, never the resolved
/// `EffectiveAuth`, so every session for a principal observes the same cache
/// entry.
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
    refresh_threshold_seconds: i64,
}

impl SessionManager {
    pub fn new(signing_secret: &str, ttl_seconds: i64, refresh_threshold_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            ttl_seconds,
            refresh_threshold_seconds,
        }
    }

    /// Create a session for a principal and encode its token
    pub fn issue(&self, subject: &str, email: &str) -> Result<(InternalSession, String)> {
        let email = email.trim().to_lowercase();
        let issued_at = Utc::now().timestamp();
        let session = InternalSession {
            session_id: Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            cache_key: email.clone(),
            email,
            issued_at,
            expires_at: issued_at + self.ttl_seconds,
        };
        let token = self.encode(&session)?;
        Ok((session, token))
    }

    pub fn encode(&self, session: &InternalSession) -> Result<String> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &SessionClaims::from(session),
            &self.encoding_key,
        )
        .map_err(|e| AuthzError::Internal(format!("failed to encode session token: {}", e)))
    }

    /// Verify the signature and expiry, returning the embedded session
    pub fn decode(&self, token: &str) -> Result<InternalSession> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(crate::token::map_jwt_error)?;
        Ok(data.claims.into())
    }

    /// Whether the session is close enough to expiry to warrant re-issuance
    pub fn requires_refresh(&self, session: &InternalSession) -> bool {
        session.requires_refresh(Utc::now().timestamp(), self.refresh_threshold_seconds)
    }
}
