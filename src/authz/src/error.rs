//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// Token-validation failures stay distinguishable here for logging; the HTTP
/// layer collapses them into a single unauthenticated outcome. `Clone` lets a
/// failed refresh be broadcast to every single-flight waiter.
#[derive(Debug, Clone, Error)]
pub enum AuthzError {
    /// Bad request shape: both/neither token supplied, unsupported verb
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Token signature did not verify
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// Token is past its expiry
    #[error("Token has expired")]
    ExpiredToken,

    /// Token audience is not in the configured allow-list
    #[error("Token audience is not allowed")]
    WrongAudience,

    /// Token issuer does not match the expected value
    #[error("Token issuer does not match")]
    WrongIssuer,

    /// Hosted-domain claim does not match the configured restriction
    #[error("Token hosted domain is not allowed")]
    WrongHostedDomain,

    /// Token could not be parsed or is missing required claims
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Caller IP rejected by the network ACL
    #[error("Client network is not allowed")]
    AclRejected,

    /// Fixed-window request limit exceeded for this client
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Directory fetch failed after the single retry
    #[error("Upstream directory unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    /// All token-validation failures collapse to one 401 outcome externally
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthzError::InvalidSignature
                | AuthzError::ExpiredToken
                | AuthzError::WrongAudience
                | AuthzError::WrongIssuer
                | AuthzError::WrongHostedDomain
                | AuthzError::MalformedToken(_)
        )
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
