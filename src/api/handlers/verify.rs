use std::sync::Arc;

use axum::{extract::Extension, http::HeaderMap, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{authenticate, error_reply, error_response, ErrorReply, ErrorResponse};
use crate::core::Gateway;

#[derive(ToSchema, Deserialize, Debug)]
pub struct VerifyCodeRequest {
    code: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct VerifyCodeResponse {
    verified: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ResendCodeResponse {
    #[serde(rename = "codeValidUntil")]
    code_valid_until: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/verify-code",
    request_body = VerifyCodeRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account verified", body = VerifyCodeResponse),
        (status = 400, description = "Wrong or expired code", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session token", body = ErrorResponse),
        (status = 409, description = "Account already verified", body = ErrorResponse),
    ),
    tag = "verification"
)]
// axum handler for verify-code
#[instrument(skip_all)]
pub async fn verify_code(
    gateway: Extension<Arc<Gateway>>,
    headers: HeaderMap,
    payload: Option<Json<VerifyCodeRequest>>,
) -> Result<Json<VerifyCodeResponse>, ErrorReply> {
    let claims = authenticate(&gateway, &headers).await?;

    let Some(Json(request)) = payload else {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    gateway
        .verification
        .validate_code(&claims.uid, &request.code, Utc::now())
        .await
        .map_err(|err| error_response(&err))?;

    Ok(Json(VerifyCodeResponse { verified: true }))
}

#[utoipa::path(
    post,
    path = "/resend-code",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Fresh code sent", body = ResendCodeResponse),
        (status = 401, description = "Missing or invalid session token", body = ErrorResponse),
        (status = 409, description = "Already verified or code still valid", body = ErrorResponse),
    ),
    tag = "verification"
)]
// axum handler for resend-code
#[instrument(skip_all)]
pub async fn resend_code(
    gateway: Extension<Arc<Gateway>>,
    headers: HeaderMap,
) -> Result<Json<ResendCodeResponse>, ErrorReply> {
    let claims = authenticate(&gateway, &headers).await?;

    let code_valid_until = gateway
        .verification
        .resend(&claims.uid, Utc::now())
        .await
        .map_err(|err| error_response(&err))?;

    Ok(Json(ResendCodeResponse { code_valid_until }))
}
