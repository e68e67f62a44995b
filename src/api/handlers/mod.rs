pub mod health;
pub use self::health::health;

pub mod root;
pub use self::root::root;

pub mod register;
pub use self::register::register;

pub mod login;
pub use self::login::login;

pub mod verify;
pub use self::verify::{resend_code, verify_code};

pub mod reset;
pub use self::reset::{forgot_password, reset_password};

pub mod profile;
pub use self::profile::update_profile;

pub mod session;
pub use self::session::validate_token;

// common functions for the handlers
use std::sync::Arc;

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use regex::Regex;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::core::{Error, Gateway};
use crate::identity::SessionClaims;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

pub fn valid_password(password: &str) -> bool {
    // provider minimum
    password.len() >= 6
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

pub type ErrorReply = (StatusCode, Json<ErrorResponse>);

pub fn error_reply(status: StatusCode, message: impl Into<String>) -> ErrorReply {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
}

/// Map a domain error to its HTTP reply. Internal failures are logged here
/// and reported to the client without detail.
pub fn error_response(err: &Error) -> ErrorReply {
    let status = match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::EmailExists | Error::AlreadyVerified | Error::CodeStillValid => {
            StatusCode::CONFLICT
        }
        Error::CodeExpired
        | Error::CodeMismatch
        | Error::TokenInvalid
        | Error::TokenExpired
        | Error::TokenNotFound
        | Error::TokenConsumed => StatusCode::BAD_REQUEST,
        Error::InvalidCredentials | Error::Unauthorized => StatusCode::UNAUTHORIZED,
        Error::Inconsistent(_) | Error::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {err:#}");
        return error_reply(status, "Internal error");
    }
    error_reply(status, err.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the bearer session token from the request headers, or produce the
/// 401 reply the handler should return.
pub async fn authenticate(
    gateway: &Arc<Gateway>,
    headers: &HeaderMap,
) -> Result<SessionClaims, ErrorReply> {
    let Some(token) = bearer_token(headers) else {
        return Err(error_reply(
            StatusCode::UNAUTHORIZED,
            "Missing bearer token",
        ));
    };
    gateway
        .identity
        .verify_session_token(token)
        .await
        .map_err(|err| error_response(&Error::from(err)))
}

#[cfg(test)]
pub mod tests_support {
    use std::sync::Arc;

    use secrecy::SecretString;

    use crate::core::{Gateway, GatewayConfig, TokenCodec};
    use crate::email::LogEmailSender;
    use crate::identity::{IdentityProvider, MemoryIdentityProvider};
    use crate::store::MemoryDocumentStore;

    /// Gateway over memory backends, as wired by dev mode.
    pub fn gateway() -> Arc<Gateway> {
        gateway_with_identity().0
    }

    /// Same as [`gateway`], keeping a handle on the identity provider so
    /// tests can mint session tokens directly.
    pub fn gateway_with_identity() -> (Arc<Gateway>, Arc<MemoryIdentityProvider>) {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let gateway = Arc::new(Gateway::new(
            Arc::clone(&identity) as Arc<dyn IdentityProvider>,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(LogEmailSender),
            TokenCodec::new(SecretString::from("test-secret")),
            GatewayConfig::new("http://localhost:3000".to_string()),
        ));
        (gateway, identity)
    }
}
