use dirgate_authz::error::AuthzError;
use dirgate_authz::service::CheckOutcome;
use dirgate_authz::token::Credential;
use dirgate_core::types::{EffectiveAuth, Source};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Authorization resolve request; exactly one token field must be set
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AuthzRequest {
    /// External identity token from the OAuth provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Internally issued session token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl AuthzRequest {
    /// Reject both/neither before any validation work runs
    pub fn credential(&self) -> Result<Credential, AuthzError> {
        match (&self.id_token, &self.session_token) {
            (Some(id), None) => Ok(Credential::IdToken(id.clone())),
            (None, Some(session)) => Ok(Credential::Session(session.clone())),
            (Some(_), Some(_)) => Err(AuthzError::MalformedRequest(
                "supply either id_token or session_token, not both".to_string(),
            )),
            (None, None) => Err(AuthzError::MalformedRequest(
                "either id_token or session_token is required".to_string(),
            )),
        }
    }
}

/// Resolve response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthzResponse {
    #[schema(value_type = Object)]
    pub effective_auth: EffectiveAuth,

    /// `cache` or `refreshed`
    #[schema(value_type = String)]
    pub source: Source,
}

/// Permission check request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    /// Module label, free string; normalized to a lowercase slug
    #[validate(length(min = 1, max = 255))]
    pub module: String,

    /// One of: create, read, update, delete, list, approve, manage
    #[validate(length(min = 1, max = 32))]
    pub action: String,
}

impl CheckRequest {
    pub fn credential(&self) -> Result<Credential, AuthzError> {
        AuthzRequest {
            id_token: self.id_token.clone(),
            session_token: self.session_token.clone(),
        }
        .credential()
    }
}

/// Permission check response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckResponse {
    pub authorized: bool,

    /// `granted` or `denied`
    #[schema(value_type = String)]
    pub decision: dirgate_authz::service::Decision,

    pub evaluated_permission: String,

    /// Verbs held for the evaluated module; empty on denial
    pub permitted_actions: Vec<String>,

    #[schema(value_type = String)]
    pub source: Source,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub reason: Option<&'static str>,
}

impl From<CheckOutcome> for CheckResponse {
    fn from(outcome: CheckOutcome) -> Self {
        Self {
            authorized: outcome.authorized,
            decision: outcome.decision,
            evaluated_permission: outcome.evaluated_permission,
            permitted_actions: outcome.permitted_actions,
            source: outcome.source,
            reason: outcome.reason,
        }
    }
}

/// Logout request: ends the session and evicts the cached authorization
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LogoutRequest {
    #[validate(length(min = 1))]
    pub session_token: String,
}

/// Error body shape
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}
