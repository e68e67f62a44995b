use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{error_reply, error_response, valid_email, valid_password, ErrorReply, ErrorResponse};
use crate::core::Gateway;

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    email: String,
    password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RegisterResponse {
    uid: String,
    email: String,
    #[serde(rename = "codeValidUntil")]
    code_valid_until: Option<DateTime<Utc>>,
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification code sent", body = RegisterResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    ),
    tag = "account"
)]
// axum handler for register
#[instrument(skip_all)]
pub async fn register(
    gateway: Extension<Arc<Gateway>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<RegisterResponse>), ErrorReply> {
    let Some(Json(request)) = payload else {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    if !valid_email(&request.email) {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Invalid email"));
    }
    if !valid_password(&request.password) {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        ));
    }

    let identity = gateway
        .identity
        .create_identity(&request.email, &request.password)
        .await
        .map_err(|err| error_response(&err.into()))?;
    debug!(user.id = %identity.uid, "identity created");

    let record = gateway
        .verification
        .issue_on_register(&identity, Utc::now())
        .await
        .map_err(|err| error_response(&err))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            uid: identity.uid,
            email: identity.email,
            code_valid_until: record.code_valid_until,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::tests_support::gateway;
    use crate::identity::IdentityProvider;

    #[tokio::test]
    async fn register_creates_pending_account() {
        let gateway = gateway();
        let (status, Json(body)) = register(
            Extension(Arc::clone(&gateway)),
            Some(Json(RegisterRequest {
                email: "a@x.com".to_string(),
                password: "secret1".to_string(),
            })),
        )
        .await
        .expect("registration succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.email, "a@x.com");
        assert!(body.code_valid_until.is_some());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let gateway = gateway();
        let request = || {
            Some(Json(RegisterRequest {
                email: "a@x.com".to_string(),
                password: "secret1".to_string(),
            }))
        };
        register(Extension(Arc::clone(&gateway)), request())
            .await
            .expect("first registration succeeds");
        let err = register(Extension(gateway), request())
            .await
            .expect_err("duplicate rejected");
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let gateway = gateway();
        let err = register(
            Extension(Arc::clone(&gateway)),
            Some(Json(RegisterRequest {
                email: "nope".to_string(),
                password: "secret1".to_string(),
            })),
        )
        .await
        .expect_err("invalid email rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = register(
            Extension(Arc::clone(&gateway)),
            Some(Json(RegisterRequest {
                email: "a@x.com".to_string(),
                password: "short".to_string(),
            })),
        )
        .await
        .expect_err("short password rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = register(Extension(gateway), None)
            .await
            .expect_err("missing payload rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
