//! Claims synchronization: keeps the profile mirror inside session-token
//! claims aligned with the authoritative identity record.
//!
//! Session tokens embed a snapshot of the claims taken when the token was
//! minted, so a profile edit leaves already-issued tokens stale. On each
//! token validation the presented claims are compared against the identity;
//! a drifted mirror is pushed back to the provider so the next minted token
//! is correct. Reconciliation never invents data and never touches the
//! authorization role.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::error::Error;
use crate::identity::{CustomClaims, Identity, IdentityProvider, SessionClaims};

const MAX_PUSH_ATTEMPTS: u32 = 3;

pub struct ClaimsSynchronizer {
    identity: Arc<dyn IdentityProvider>,
}

/// Compare the token's profile mirror against the authoritative identity.
/// Returns the claims to push when they drifted, `None` when aligned.
/// Pure so the comparison can be tested without a provider.
#[must_use]
pub fn reconcile(presented: &SessionClaims, identity: &Identity) -> Option<CustomClaims> {
    let aligned = presented.name == identity.display_name
        && presented.picture == identity.photo_url;
    if aligned {
        return None;
    }
    Some(CustomClaims {
        // Role is owned by the verification flow, not the profile mirror.
        role: identity.claims.role.clone(),
        name: identity.display_name.clone(),
        picture: identity.photo_url.clone(),
    })
}

impl ClaimsSynchronizer {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    /// Validate-token path: fetch the authoritative identity, push corrected
    /// claims if the presented ones drifted, and return the identity.
    ///
    /// # Errors
    /// `NotFound` when the identity behind the token no longer exists,
    /// `Transient` when the provider is unreachable.
    pub async fn synchronize(&self, presented: &SessionClaims) -> Result<Identity, Error> {
        let identity = self.identity.get_by_id(&presented.uid).await?;

        let Some(claims) = reconcile(presented, &identity) else {
            debug!(user.id = %identity.uid, "session claims already aligned");
            return Ok(identity);
        };

        self.push_claims(&identity.uid, claims.clone()).await?;
        info!(user.id = %identity.uid, "session claims reconciled");

        Ok(Identity { claims, ..identity })
    }

    /// Push claims with a small bounded retry. Only transport failures are
    /// retried; everything else is final on the first answer.
    async fn push_claims(&self, uid: &str, claims: CustomClaims) -> Result<(), Error> {
        let mut attempt = 1;
        loop {
            match self.identity.set_claims(uid, claims.clone()).await {
                Ok(()) => return Ok(()),
                Err(crate::identity::ProviderError::Transport(err))
                    if attempt < MAX_PUSH_ATTEMPTS =>
                {
                    warn!(
                        user.id = %uid,
                        attempt,
                        "claims push failed, retrying: {err}"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityUpdate, MemoryIdentityProvider};
    use anyhow::Result;

    fn identity_with(display_name: Option<&str>, photo_url: Option<&str>) -> Identity {
        Identity {
            uid: "uid-1".to_string(),
            email: "a@x.com".to_string(),
            email_verified: true,
            display_name: display_name.map(str::to_string),
            photo_url: photo_url.map(str::to_string),
            claims: CustomClaims {
                role: Some("member".to_string()),
                name: display_name.map(str::to_string),
                picture: photo_url.map(str::to_string),
            },
        }
    }

    fn presented(name: Option<&str>, picture: Option<&str>) -> SessionClaims {
        SessionClaims {
            uid: "uid-1".to_string(),
            email: Some("a@x.com".to_string()),
            email_verified: true,
            role: Some("member".to_string()),
            name: name.map(str::to_string),
            picture: picture.map(str::to_string),
        }
    }

    #[test]
    fn aligned_claims_need_no_push() {
        let identity = identity_with(Some("Alice"), None);
        assert_eq!(reconcile(&presented(Some("Alice"), None), &identity), None);
    }

    #[test]
    fn drifted_name_is_corrected_and_role_preserved() {
        let identity = identity_with(Some("Alice Cooper"), None);
        let claims = reconcile(&presented(Some("Alice"), None), &identity)
            .expect("drift detected");
        assert_eq!(claims.name.as_deref(), Some("Alice Cooper"));
        assert_eq!(claims.role.as_deref(), Some("member"));
        assert_eq!(claims.picture, None);
    }

    #[test]
    fn cleared_photo_clears_the_mirror() {
        let identity = identity_with(Some("Alice"), None);
        let claims = reconcile(
            &presented(Some("Alice"), Some("https://cdn.example.com/a.png")),
            &identity,
        )
        .expect("drift detected");
        assert_eq!(claims.picture, None);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut identity = identity_with(Some("Alice Cooper"), None);
        let claims = reconcile(&presented(Some("Alice"), None), &identity)
            .expect("drift detected");
        // After applying the correction, a second pass finds nothing to do.
        identity.claims = claims.clone();
        let after = SessionClaims {
            name: claims.name,
            picture: claims.picture,
            ..presented(None, None)
        };
        assert_eq!(reconcile(&after, &identity), None);
    }

    #[tokio::test]
    async fn synchronize_pushes_drifted_claims() -> Result<()> {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let created = provider.create_identity("a@x.com", "secret1").await?;
        let token = provider.issue_session(&created.uid).await?;

        provider
            .update_profile(
                &created.uid,
                IdentityUpdate {
                    display_name: Some("Alice".to_string()),
                    ..IdentityUpdate::default()
                },
            )
            .await?;

        let stale = provider.verify_session_token(&token).await?;
        assert_eq!(stale.name, None);

        let synchronizer =
            ClaimsSynchronizer::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        let identity = synchronizer.synchronize(&stale).await?;
        assert_eq!(identity.claims.name.as_deref(), Some("Alice"));

        // The provider now holds the corrected claims, so a fresh token is
        // minted with them.
        let fresh = provider.issue_session(&created.uid).await?;
        let claims = provider.verify_session_token(&fresh).await?;
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        Ok(())
    }

    #[tokio::test]
    async fn synchronize_for_deleted_identity_is_not_found() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let synchronizer =
            ClaimsSynchronizer::new(Arc::clone(&provider) as Arc<dyn IdentityProvider>);
        let result = synchronizer.synchronize(&presented(None, None)).await;
        assert!(matches!(result, Err(Error::NotFound("identity"))));
    }
}
