//! In-memory identity provider for local development and tests.
//!
//! Accounts and sessions live in a mutex-guarded map. Session tokens capture
//! a snapshot of the claims at sign-in time, the same way a real provider
//! embeds claims in a token when it is minted; later profile changes are not
//! visible through an already-issued token until claims are pushed and a new
//! token is minted.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use ulid::Ulid;

use super::{
    CustomClaims, Identity, IdentityProvider, IdentityUpdate, ProviderError, SessionClaims,
    SignedInSession,
};

#[derive(Clone, Debug)]
struct Account {
    uid: String,
    email: String,
    password: String,
    email_verified: bool,
    display_name: Option<String>,
    photo_url: Option<String>,
    claims: CustomClaims,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            claims: self.claims.clone(),
        }
    }

    fn session_claims(&self) -> SessionClaims {
        SessionClaims {
            uid: self.uid.clone(),
            email: Some(self.email.clone()),
            email_verified: self.email_verified,
            role: self.claims.role.clone(),
            name: self.claims.name.clone(),
            picture: self.claims.picture.clone(),
        }
    }
}

#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    // token -> claims snapshot captured when the token was minted
    sessions: Mutex<HashMap<String, SessionClaims>>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a session token for an existing account without a password
    /// round-trip. Test helper mirroring what `sign_in` does.
    pub async fn issue_session(&self, uid: &str) -> Result<String, ProviderError> {
        let accounts = self.accounts.lock().await;
        let account = accounts.get(uid).ok_or(ProviderError::NotFound)?;
        let token = Ulid::new().to_string();
        let claims = account.session_claims();
        drop(accounts);
        self.sessions.lock().await.insert(token.clone(), claims);
        Ok(token)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderError> {
        let mut accounts = self.accounts.lock().await;
        if accounts.values().any(|account| account.email == email) {
            return Err(ProviderError::EmailExists);
        }
        let account = Account {
            uid: Ulid::new().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            email_verified: false,
            display_name: None,
            photo_url: None,
            claims: CustomClaims::default(),
        };
        let identity = account.identity();
        accounts.insert(account.uid.clone(), account);
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInSession, ProviderError> {
        let accounts = self.accounts.lock().await;
        let account = accounts
            .values()
            .find(|account| account.email == email)
            .ok_or(ProviderError::NotFound)?;
        if account.password != password {
            return Err(ProviderError::InvalidCredentials);
        }
        let session = SignedInSession {
            uid: account.uid.clone(),
            email: account.email.clone(),
            token: Ulid::new().to_string(),
        };
        let claims = account.session_claims();
        drop(accounts);
        self.sessions
            .lock()
            .await
            .insert(session.token.clone(), claims);
        Ok(session)
    }

    async fn get_by_email(&self, email: &str) -> Result<Identity, ProviderError> {
        let accounts = self.accounts.lock().await;
        accounts
            .values()
            .find(|account| account.email == email)
            .map(Account::identity)
            .ok_or(ProviderError::NotFound)
    }

    async fn get_by_id(&self, uid: &str) -> Result<Identity, ProviderError> {
        let accounts = self.accounts.lock().await;
        accounts
            .get(uid)
            .map(Account::identity)
            .ok_or(ProviderError::NotFound)
    }

    async fn update_password(&self, uid: &str, new_password: &str) -> Result<(), ProviderError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(uid).ok_or(ProviderError::NotFound)?;
        account.password = new_password.to_string();
        Ok(())
    }

    async fn update_profile(
        &self,
        uid: &str,
        update: IdentityUpdate,
    ) -> Result<(), ProviderError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(uid).ok_or(ProviderError::NotFound)?;
        if let Some(display_name) = update.display_name {
            account.display_name = Some(display_name);
        }
        if let Some(photo_url) = update.photo_url {
            account.photo_url = Some(photo_url);
        }
        if let Some(email_verified) = update.email_verified {
            account.email_verified = email_verified;
        }
        Ok(())
    }

    async fn set_claims(&self, uid: &str, claims: CustomClaims) -> Result<(), ProviderError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(uid).ok_or(ProviderError::NotFound)?;
        account.claims = claims;
        Ok(())
    }

    async fn verify_session_token(&self, token: &str) -> Result<SessionClaims, ProviderError> {
        let sessions = self.sessions.lock().await;
        sessions.get(token).cloned().ok_or(ProviderError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_rejects_duplicate_email() -> Result<(), ProviderError> {
        let provider = MemoryIdentityProvider::new();
        provider.create_identity("a@x.com", "secret1").await?;
        let result = provider.create_identity("a@x.com", "secret2").await;
        assert!(matches!(result, Err(ProviderError::EmailExists)));
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_checks_password() -> Result<(), ProviderError> {
        let provider = MemoryIdentityProvider::new();
        provider.create_identity("a@x.com", "secret1").await?;
        assert!(matches!(
            provider.sign_in("a@x.com", "wrong").await,
            Err(ProviderError::InvalidCredentials)
        ));
        let session = provider.sign_in("a@x.com", "secret1").await?;
        assert_eq!(session.email, "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn session_claims_are_snapshotted_at_issue_time() -> Result<(), ProviderError> {
        let provider = MemoryIdentityProvider::new();
        let identity = provider.create_identity("a@x.com", "secret1").await?;
        let token = provider.issue_session(&identity.uid).await?;

        provider
            .update_profile(
                &identity.uid,
                IdentityUpdate {
                    display_name: Some("Alice".to_string()),
                    ..IdentityUpdate::default()
                },
            )
            .await?;

        // The token still carries the claims from before the update.
        let claims = provider.verify_session_token(&token).await?;
        assert_eq!(claims.name, None);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        assert!(matches!(
            provider.verify_session_token("nope").await,
            Err(ProviderError::InvalidToken)
        ));
    }
}
