//! Signed password-reset tokens (HS256, shared secret).
//!
//! Tokens are stateless bearers carrying the subject email, the subject id,
//! and an expiry. Validity is a pure function of signature and expiry; the
//! single-use guarantee comes from the persisted `ResetTicket`, not from the
//! token itself. Expiry is checked against the caller's clock so flows can be
//! tested with a simulated one.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::core::error::Error;

/// Claims embedded in a reset token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub email: String,
    pub uid: String,
    pub exp: i64,
}

pub struct TokenCodec {
    secret: SecretString,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Issue a reset token for the given identity, valid for `ttl` from `now`.
    ///
    /// # Errors
    /// Returns `Transient` if signing fails.
    pub fn issue(
        &self,
        email: &str,
        uid: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, Error> {
        let claims = ResetClaims {
            email: email.to_string(),
            uid: uid.to_string(),
            exp: (now + ttl).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|err| Error::Transient(err.into()))
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// # Errors
    /// `TokenInvalid` for a bad signature or malformed token, `TokenExpired`
    /// when `now` is at or past the embedded expiry.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<ResetClaims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced against the caller's clock below.
        validation.validate_exp = false;
        let data = decode::<ResetClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map_err(|_| Error::TokenInvalid)?;

        if now.timestamp() >= data.claims.exp {
            return Err(Error::TokenExpired);
        }

        Ok(data.claims)
    }
}
