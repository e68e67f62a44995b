//! Identity provider contract and shared types.
//!
//! The provider is the external system of record for credentials, session
//! tokens, and claims. The gateway never creates or deletes identities on its
//! own; registration delegates to [`IdentityProvider::create_identity`] and
//! every mutation goes through the provider's update operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod rest;

pub use memory::MemoryIdentityProvider;
pub use rest::RestIdentityProvider;

/// Custom claims mirrored into session tokens: authorization role plus the
/// display-name/photo mirrors the frontend reads without a store round-trip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Authoritative identity record as held by the provider.
#[derive(Clone, Debug)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub claims: CustomClaims,
}

/// Claims decoded from a presented session token. These reflect profile state
/// at token-issue time and may lag the authoritative [`Identity`].
#[derive(Clone, Debug)]
pub struct SessionClaims {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub role: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Partial update applied to the provider's profile fields.
#[derive(Clone, Debug, Default)]
pub struct IdentityUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: Option<bool>,
}

/// Result of a successful password sign-in.
#[derive(Clone, Debug)]
pub struct SignedInSession {
    pub uid: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity not found")]
    NotFound,
    #[error("email already in use")]
    EmailExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired session token")]
    InvalidToken,
    #[error("identity provider call failed: {0}")]
    Transport(#[from] anyhow::Error),
}

/// External identity provider operations consumed by the gateway core.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_identity(&self, email: &str, password: &str)
        -> Result<Identity, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str)
        -> Result<SignedInSession, ProviderError>;

    async fn get_by_email(&self, email: &str) -> Result<Identity, ProviderError>;

    async fn get_by_id(&self, uid: &str) -> Result<Identity, ProviderError>;

    async fn update_password(&self, uid: &str, new_password: &str) -> Result<(), ProviderError>;

    async fn update_profile(&self, uid: &str, update: IdentityUpdate)
        -> Result<(), ProviderError>;

    /// Replace the identity's custom claims. Setting the same claims twice is
    /// a no-op, which is what makes reconciliation idempotent.
    async fn set_claims(&self, uid: &str, claims: CustomClaims) -> Result<(), ProviderError>;

    async fn verify_session_token(&self, token: &str) -> Result<SessionClaims, ProviderError>;
}
