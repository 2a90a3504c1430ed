//! Middleware layer for the API server
//!
//! - Request ID tracking
//! - Request logging
//! - CORS configuration
//! - Client IP resolution (forwarded-for aware)

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

/// Request ID header name
pub const X_REQUEST_ID: &str = "x-request-id";

/// Forwarded client address header
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Configure CORS middleware
///
/// Allows cross-origin requests from any origin with the methods this API
/// serves. Production deployments should restrict allowed origins.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(X_REQUEST_ID),
        ])
        .expose_headers([HeaderName::from_static(X_REQUEST_ID)])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Request ID middleware
///
/// Generates or extracts a unique request ID, stores it in request extensions
/// for handlers, and echoes it in the response headers.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    response.headers_mut().insert(
        X_REQUEST_ID,
        HeaderValue::from_str(&request_id.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("invalid-uuid")),
    );

    response
}

/// Request logging middleware
///
/// Logs method, URI, status and duration with the request ID for correlation.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<Uuid>()
        .copied()
        .unwrap_or_else(Uuid::new_v4);

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Incoming request"
    );

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let status = response.status();
    macro_rules! log_completed {
        ($lvl:expr) => {
            tracing::event!(
                $lvl,
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status.as_u16(),
                duration_ms = elapsed.as_millis() as u64,
                "Request completed"
            )
        };
    }
    match status.as_u16() {
        500..=599 => log_completed!(tracing::Level::ERROR),
        400..=499 => log_completed!(tracing::Level::WARN),
        _ => log_completed!(tracing::Level::INFO),
    }

    response
}

/// Resolve the caller address: first `X-Forwarded-For` hop when present,
/// otherwise the socket peer address
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .unwrap_or_else(|| peer.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_request_id_middleware() {
        let app = Router::new()
            .route("/", get(test_handler))
            .layer(middleware::from_fn(request_id_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_cors_layer() {
        let app = Router::new().route("/", get(test_handler)).layer(cors_layer());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header(header::ORIGIN, "http://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("10.1.2.3, 172.16.0.1"),
        );
        assert_eq!(client_ip(&headers, peer), "10.1.2.3".parse::<IpAddr>().unwrap());

        // Garbage forwarded header falls back to the peer address
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("not-an-ip"));
        assert_eq!(client_ip(&headers, peer), peer.ip());

        assert_eq!(client_ip(&HeaderMap::new(), peer), peer.ip());
    }
}
