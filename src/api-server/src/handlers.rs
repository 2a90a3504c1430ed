use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use validator::Validate;

use crate::{
    error::{ApiError, Result},
    middleware::client_ip,
    models::*,
    state::AppState,
    HealthResponse, VersionInfo,
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Version information endpoint
#[utoipa::path(
    get,
    path = "/version",
    responses(
        (status = 200, description = "Version information", body = VersionInfo)
    ),
    tag = "health"
)]
pub async fn version_info(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(VersionInfo {
        version: state.version.clone(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
        git_commit: option_env!("GIT_COMMIT").unwrap_or("unknown").to_string(),
    })
}

/// Resolve the caller's effective authorization
#[utoipa::path(
    post,
    path = "/authz",
    request_body = AuthzRequest,
    responses(
        (status = 200, description = "Resolved authorization document", body = AuthzResponse),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 403, description = "Network ACL rejection", body = ErrorResponse),
        (status = 404, description = "Refresh failed", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "authorization"
)]
pub async fn authz_resolve(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<AuthzRequest>,
) -> Result<Json<AuthzResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let credential = req.credential()?;

    let ip = client_ip(&headers, peer);
    let (effective_auth, source) = state
        .service
        .resolve(ip, &credential)
        .await
        .map_err(|e| ApiError::from_authz(e, state.acl_reject_as_not_found))?;

    Ok(Json(AuthzResponse {
        effective_auth,
        source,
    }))
}

/// Evaluate one module/action permission for the caller
#[utoipa::path(
    post,
    path = "/authz/check",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Permission granted", body = CheckResponse),
        (status = 403, description = "Permission denied", body = CheckResponse),
        (status = 400, description = "Malformed payload or unsupported action", body = ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 404, description = "Refresh failed", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "authorization"
)]
pub async fn authz_check(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CheckRequest>,
) -> Result<Response> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let credential = req.credential()?;

    let ip = client_ip(&headers, peer);
    let outcome = state
        .service
        .check(ip, &credential, &req.module, &req.action)
        .await
        .map_err(|e| ApiError::from_authz(e, state.acl_reject_as_not_found))?;

    // Denial is a normal outcome with a structured body, not an error
    let status = if outcome.authorized {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    Ok((status, Json(CheckResponse::from(outcome))).into_response())
}

/// End a session and evict its cached authorization
#[utoipa::path(
    post,
    path = "/authz/logout",
    request_body = LogoutRequest,
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "Invalid or expired session", body = ErrorResponse)
    ),
    tag = "authorization"
)]
pub async fn authz_logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<StatusCode> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    state.service.logout(&req.session_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
