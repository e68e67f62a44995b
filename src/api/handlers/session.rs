use std::sync::Arc;

use axum::{extract::Extension, http::HeaderMap, Json};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::{authenticate, error_response, ErrorReply, ErrorResponse};
use crate::core::Gateway;

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    uid: String,
    email: String,
    email_verified: bool,
    role: Option<String>,
    display_name: Option<String>,
    #[serde(rename = "photoURL")]
    photo_url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/validate-token",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid; authoritative session snapshot", body = SessionResponse),
        (status = 401, description = "Missing or invalid session token", body = ErrorResponse),
    ),
    tag = "session"
)]
// axum handler for validate-token
#[instrument(skip_all)]
pub async fn validate_token(
    gateway: Extension<Arc<Gateway>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ErrorReply> {
    let claims = authenticate(&gateway, &headers).await?;

    // Reconcile stale token claims against the identity before answering.
    let identity = gateway
        .claims
        .synchronize(&claims)
        .await
        .map_err(|err| error_response(&err))?;

    Ok(Json(SessionResponse {
        uid: identity.uid,
        email: identity.email,
        email_verified: identity.email_verified,
        role: identity.claims.role,
        display_name: identity.display_name,
        photo_url: identity.photo_url,
    }))
}
