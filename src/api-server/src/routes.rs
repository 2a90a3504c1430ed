//! Route definitions for the API server
//!
//! Configures the decision endpoints, health/version, OpenAPI documentation,
//! and the middleware stack.

use crate::{handlers, middleware, state::AppState};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "dirgate Authorization API",
        version = "0.1.0",
        description = "Directory-backed authorization decision service",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        handlers::health_check,
        handlers::version_info,
        handlers::authz_resolve,
        handlers::authz_check,
        handlers::authz_logout,
    ),
    components(
        schemas(
            crate::HealthResponse,
            crate::VersionInfo,
            crate::models::AuthzRequest,
            crate::models::AuthzResponse,
            crate::models::CheckRequest,
            crate::models::CheckResponse,
            crate::models::LogoutRequest,
            crate::models::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health and build info endpoints"),
        (name = "authorization", description = "Authorization decision endpoints"),
    )
)]
pub struct ApiDoc;

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/version", get(handlers::version_info))
        .route("/authz", post(handlers::authz_resolve))
        .route("/authz/check", post(handlers::authz_check))
        .route("/authz/logout", post(handlers::authz_logout))
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        // Middleware layers (executed bottom to top)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use dirgate_authz::cache::{CacheConfig, CacheStore};
    use dirgate_authz::mapper::{DerivationTable, EffectiveAuthMapper};
    use dirgate_authz::service::AuthzService;
    use dirgate_authz::session::SessionManager;
    use dirgate_authz::token::{IdTokenConfig, TokenValidator};
    use dirgate_authz::{NetworkAcl, RateLimiter, StaticDirectoryFetcher};
    use jsonwebtoken::{Algorithm, DecodingKey};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const FIXTURE: &str = r#"{
        "alice@example.com": {
            "profile": {"primary_email": "alice@example.com"},
            "attributes": {
                "UserFunctions": "Inventory:Read\nInventory:Update"
            },
            "groups": []
        }
    }"#;

    fn test_state(networks: &str, rate_limit: u32) -> AppState {
        let sessions = Arc::new(SessionManager::new("routes-test-secret", 3600, 300));
        let fetcher = Arc::new(StaticDirectoryFetcher::from_json(FIXTURE).unwrap());
        let mapper = Arc::new(EffectiveAuthMapper::new(DerivationTable::empty()));
        let cache = Arc::new(CacheStore::new(CacheConfig::default(), fetcher, mapper));
        let validator = TokenValidator::new(
            IdTokenConfig {
                decoding_key: DecodingKey::from_secret(b"unused"),
                algorithm: Algorithm::HS256,
                expected_issuer: "https://accounts.example.com".to_string(),
                allowed_audiences: vec!["client-a".to_string()],
                allowed_hosted_domain: None,
            },
            Arc::clone(&sessions),
        );
        let service = AuthzService::new(
            NetworkAcl::parse(networks).unwrap(),
            RateLimiter::new(rate_limit, Duration::from_secs(60)),
            validator,
            cache,
            sessions,
        );
        AppState::new(Arc::new(service), false)
    }

    fn test_app(state: AppState) -> Router {
        let peer: SocketAddr = "127.0.0.1:4444".parse().unwrap();
        create_router(state).layer(MockConnectInfo(peer))
    }

    fn session_token(state: &AppState, email: &str) -> String {
        let (_, token) = state.service.sessions().issue("test-subject", email).unwrap();
        token
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app(test_state("*", 100));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_openapi_json() {
        let app = test_app(test_state("*", 100));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_authz_resolve_with_session() {
        let state = test_state("*", 100);
        let token = session_token(&state, "alice@example.com");
        let app = test_app(state);

        let response = app
            .oneshot(post_json(
                "/authz",
                format!(r#"{{"session_token": "{}"}}"#, token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_authz_requires_exactly_one_token() {
        let app = test_app(test_state("*", 100));
        let response = app
            .clone()
            .oneshot(post_json("/authz", "{}".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json(
                "/authz",
                r#"{"id_token": "a", "session_token": "b"}"#.to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_authz_invalid_token_is_401() {
        let app = test_app(test_state("*", 100));
        let response = app
            .oneshot(post_json(
                "/authz",
                r#"{"session_token": "garbage"}"#.to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_check_granted_and_denied() {
        let state = test_state("*", 100);
        let token = session_token(&state, "alice@example.com");
        let app = test_app(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/authz/check",
                format!(
                    r#"{{"session_token": "{}", "module": "inventory", "action": "read"}}"#,
                    token
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post_json(
                "/authz/check",
                format!(
                    r#"{{"session_token": "{}", "module": "inventory", "action": "manage"}}"#,
                    token
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_check_invalid_verb_is_400() {
        let state = test_state("*", 100);
        let token = session_token(&state, "alice@example.com");
        let app = test_app(state);

        let response = app
            .oneshot(post_json(
                "/authz/check",
                format!(
                    r#"{{"session_token": "{}", "module": "inventory", "action": "destroy"}}"#,
                    token
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_acl_rejection_is_403() {
        let state = test_state("10.9.0.0/16", 100);
        let token = session_token(&state, "alice@example.com");
        let app = test_app(state);

        let response = app
            .oneshot(post_json(
                "/authz",
                format!(r#"{{"session_token": "{}"}}"#, token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_forwarded_for_reaches_the_acl() {
        let state = test_state("10.9.0.0/16", 100);
        let token = session_token(&state, "alice@example.com");
        let app = test_app(state);

        let request = Request::builder()
            .method("POST")
            .uri("/authz")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "10.9.1.2")
            .body(Body::from(format!(r#"{{"session_token": "{}"}}"#, token)))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_is_429() {
        let state = test_state("*", 1);
        let token = session_token(&state, "alice@example.com");
        let app = test_app(state);

        let body = format!(r#"{{"session_token": "{}"}}"#, token);
        let response = app.clone().oneshot(post_json("/authz", body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(post_json("/authz", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_unknown_principal_is_404() {
        let state = test_state("*", 100);
        let token = session_token(&state, "stranger@example.com");
        let app = test_app(state);

        let response = app
            .oneshot(post_json(
                "/authz",
                format!(r#"{{"session_token": "{}"}}"#, token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logout_evicts_and_returns_no_content() {
        let state = test_state("*", 100);
        let token = session_token(&state, "alice@example.com");
        let app = test_app(state.clone());

        app.clone()
            .oneshot(post_json(
                "/authz",
                format!(r#"{{"session_token": "{}"}}"#, token),
            ))
            .await
            .unwrap();
        assert_eq!(state.service.cache().len(), 1);

        let response = app
            .oneshot(post_json(
                "/authz/logout",
                format!(r#"{{"session_token": "{}"}}"#, token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.service.cache().len(), 0);
    }
}
