use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method, Request},
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::core::Gateway;

pub mod handlers;
pub mod openapi;

/// Build the application router over a gateway.
#[must_use]
pub fn router(gateway: Arc<Gateway>) -> Router {
    let cors = CorsLayer::new()
        // browser frontend calls every route directly
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/verify-code", post(handlers::verify_code))
        .route("/resend-code", post(handlers::resend_code))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password))
        .route("/profile", patch(handlers::update_profile))
        .route("/validate-token", get(handlers::validate_token))
        .merge(
            SwaggerUi::new("/swagger")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Ulid::new().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(gateway)),
        )
}

/// Bind and serve.
/// # Errors
/// Returns an error if the server fails to start
pub async fn new(port: u16, gateway: Arc<Gateway>) -> Result<()> {
    let app = router(gateway);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::tests_support::gateway;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_route_is_wired() -> Result<()> {
        let app = router(gateway());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        Ok(())
    }

    #[tokio::test]
    async fn register_without_body_is_bad_request() -> Result<()> {
        let app = router(gateway());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/register")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn full_verification_flow_over_http() -> Result<()> {
        use crate::api::handlers::tests_support::gateway_with_identity;
        use http_body_util::BodyExt;
        use serde_json::{json, Value};

        let (gateway, _) = gateway_with_identity();
        let app = router(Arc::clone(&gateway));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"email": "a@x.com", "password": "secret1"}).to_string(),
                    ))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value =
            serde_json::from_slice(&response.into_body().collect().await?.to_bytes())?;
        let uid = body["uid"].as_str().expect("uid").to_string();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"email": "a@x.com", "password": "secret1"}).to_string(),
                    ))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value =
            serde_json::from_slice(&response.into_body().collect().await?.to_bytes())?;
        let token = body["token"].as_str().expect("token").to_string();

        // The emailed code is readable through the profile record.
        let code = gateway
            .profile
            .get(&uid)
            .await
            .expect("record")
            .verification_code
            .expect("pending code");

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/verify-code")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(json!({"code": code}).to_string()))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let record = gateway.profile.get(&uid).await.expect("record");
        assert!(record.verified);
        Ok(())
    }

    #[tokio::test]
    async fn openapi_document_is_served() -> Result<()> {
        let app = router(gateway());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }
}
