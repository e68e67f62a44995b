use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{error_reply, error_response, ErrorReply, ErrorResponse};
use crate::core::Gateway;

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    uid: String,
    email: String,
    token: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 404, description = "No account with that email", body = ErrorResponse),
    ),
    tag = "account"
)]
// axum handler for login
#[instrument(skip_all)]
pub async fn login(
    gateway: Extension<Arc<Gateway>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, ErrorReply> {
    let Some(Json(request)) = payload else {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    let session = gateway
        .identity
        .sign_in(&request.email, &request.password)
        .await
        .map_err(|err| error_response(&err.into()))?;

    Ok(Json(LoginResponse {
        uid: session.uid,
        email: session.email,
        token: session.token,
    }))
}
