use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{error_reply, error_response, valid_email, valid_password, ErrorReply, ErrorResponse};
use crate::core::Gateway;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    email: String,
}

#[derive(ToSchema, Deserialize)]
pub struct ResetPasswordRequest {
    token: String,
    password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 404, description = "No account with that email", body = ErrorResponse),
    ),
    tag = "reset"
)]
// axum handler for forgot-password
#[instrument(skip_all)]
pub async fn forgot_password(
    gateway: Extension<Arc<Gateway>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    let Some(Json(request)) = payload else {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Missing payload"));
    };
    if !valid_email(&request.email) {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Invalid email"));
    }

    gateway
        .reset
        .request_reset(&request.email, Utc::now())
        .await
        .map_err(|err| error_response(&err))?;

    Ok(Json(MessageResponse {
        message: "Reset link sent".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid, expired, or used token", body = ErrorResponse),
    ),
    tag = "reset"
)]
// axum handler for reset-password
#[instrument(skip_all)]
pub async fn reset_password(
    gateway: Extension<Arc<Gateway>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    let Some(Json(request)) = payload else {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Missing payload"));
    };
    if !valid_password(&request.password) {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        ));
    }

    gateway
        .reset
        .complete_reset(&request.token, &request.password, Utc::now())
        .await
        .map_err(|err| error_response(&err))?;

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::tests_support::gateway_with_identity;
    use crate::identity::IdentityProvider;

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_not_found() {
        let (gateway, _) = gateway_with_identity();
        let err = forgot_password(
            Extension(gateway),
            Some(Json(ForgotPasswordRequest {
                email: "nobody@x.com".to_string(),
            })),
        )
        .await
        .expect_err("rejected");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reset_password_rejects_garbage_token() -> anyhow::Result<()> {
        let (gateway, identity) = gateway_with_identity();
        identity.create_identity("a@x.com", "secret1").await?;

        forgot_password(
            Extension(Arc::clone(&gateway)),
            Some(Json(ForgotPasswordRequest {
                email: "a@x.com".to_string(),
            })),
        )
        .await
        .expect("request accepted");

        let err = reset_password(
            Extension(gateway),
            Some(Json(ResetPasswordRequest {
                token: "not-a-token".to_string(),
                password: "new-password".to_string(),
            })),
        )
        .await
        .expect_err("rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password() {
        let (gateway, _) = gateway_with_identity();
        let err = reset_password(
            Extension(gateway),
            Some(Json(ResetPasswordRequest {
                token: "whatever".to_string(),
                password: "short".to_string(),
            })),
        )
        .await
        .expect_err("rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
