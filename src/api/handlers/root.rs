use axum::response::IntoResponse;

// axum handler for the bare root, useful as a load balancer target
pub async fn root() -> impl IntoResponse {
    env!("CARGO_PKG_NAME")
}
