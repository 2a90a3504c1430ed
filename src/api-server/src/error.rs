use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dirgate_authz::error::AuthzError;
use serde_json::json;
use tracing::warn;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authorization error: {0}")]
    Authz(AuthzError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ApiError {
    /// Map an engine error, honoring the configured ACL-rejection status
    pub fn from_authz(err: AuthzError, acl_reject_as_not_found: bool) -> Self {
        if matches!(err, AuthzError::AclRejected) && acl_reject_as_not_found {
            // Present the rejection as a missing resource to avoid leaking
            // endpoint existence
            warn!("ACL rejection reported as not-found");
            return ApiError::Authz(AuthzError::UpstreamUnavailable("not found".to_string()));
        }
        ApiError::Authz(err)
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Authz(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Token failures stay distinguishable in logs but collapse to one
            // externally visible outcome
            ApiError::Authz(e) if e.is_unauthenticated() => {
                warn!(error = %e, "Request unauthenticated");
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            ApiError::Authz(AuthzError::MalformedRequest(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Authz(AuthzError::AclRejected) => (
                StatusCode::FORBIDDEN,
                "Client network is not allowed".to_string(),
            ),
            ApiError::Authz(AuthzError::RateLimited) => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
            // The refresh-failed convention for this API is 404
            ApiError::Authz(AuthzError::UpstreamUnavailable(_)) => (
                StatusCode::NOT_FOUND,
                "Authorization data unavailable".to_string(),
            ),
            ApiError::Authz(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ApiError::Authz(AuthzError::MalformedRequest("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Authz(AuthzError::ExpiredToken)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Authz(AuthzError::InvalidSignature)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Authz(AuthzError::AclRejected)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Authz(AuthzError::RateLimited)),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(ApiError::Authz(AuthzError::UpstreamUnavailable("x".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_acl_rejection_can_hide_as_not_found() {
        let err = ApiError::from_authz(AuthzError::AclRejected, true);
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);

        let err = ApiError::from_authz(AuthzError::AclRejected, false);
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }
}
