//! Email-verification lifecycle: `Pending -> Verified`, driven by a 6-digit
//! emailed code with a bounded validity window.
//!
//! The profile record in the document store is the source of truth for
//! verification state. Promotion to `Verified` happens through a conditional
//! write keyed on the pre-transition state, so two concurrent submissions of
//! the same code resolve to exactly one winner. Once promoted, the identity
//! provider is brought in line (`email_verified` flag plus the `member` role
//! claim); a failure on that second leg surfaces as `Inconsistent`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::core::config::GatewayConfig;
use crate::core::error::Error;
use crate::email::{render_verification_email, EmailSender};
use crate::identity::{Identity, IdentityProvider, IdentityUpdate};
use crate::store::{ProfileRecord, ProfileStore};

pub struct VerificationStateMachine {
    profiles: ProfileStore,
    identity: Arc<dyn IdentityProvider>,
    mailer: Arc<dyn EmailSender>,
    config: GatewayConfig,
}

/// Uniform 6-digit code, zero-padded.
fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

impl VerificationStateMachine {
    #[must_use]
    pub fn new(
        profiles: ProfileStore,
        identity: Arc<dyn IdentityProvider>,
        mailer: Arc<dyn EmailSender>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            profiles,
            identity,
            mailer,
            config,
        }
    }

    /// Create the pending profile record for a freshly registered identity and
    /// send the verification code. The identity already exists when this runs,
    /// so a failed profile write leaves the stores diverged.
    ///
    /// # Errors
    /// `Inconsistent` if the profile record cannot be written.
    pub async fn issue_on_register(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<ProfileRecord, Error> {
        let code = generate_code();
        let record = ProfileRecord {
            email: identity.email.clone(),
            verified: false,
            verification_code: Some(code.clone()),
            code_valid_until: Some(now + self.config.code_ttl()),
            display_name: None,
            photo_url: None,
            rut: None,
            birthdate: None,
            created_at: now,
        };
        self.profiles
            .put(&identity.uid, &record)
            .await
            .map_err(|err| {
                Error::Inconsistent(format!(
                    "identity created but profile record write failed: {err}"
                ))
            })?;

        // Delivery is best-effort; the code can be resent.
        if let Err(err) = self
            .mailer
            .send(render_verification_email(&code, &identity.email))
            .await
        {
            warn!(user.id = %identity.uid, "failed to send verification email: {err}");
        }

        Ok(record)
    }

    /// Submit a code for a pending account. On success the account is
    /// `Verified`, the code fields are cleared, and the identity mirror is
    /// updated (`email_verified` plus the `member` role claim).
    ///
    /// # Errors
    /// `NotFound` when no profile record exists, `AlreadyVerified` on replay
    /// (including losing a concurrent race), `CodeExpired` when the window has
    /// passed, `CodeMismatch` for a wrong code, `Inconsistent` when the store
    /// promoted but the identity mirror could not be updated.
    pub async fn validate_code(
        &self,
        uid: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let record = self
            .profiles
            .get(uid)
            .await
            .map_err(Error::Transient)?
            .ok_or(Error::NotFound("profile"))?;

        if record.verified {
            return Err(Error::AlreadyVerified);
        }

        // A pending record without a window cannot be verified; treat it the
        // same as an expired code so the caller's recovery is to resend.
        match record.code_valid_until {
            Some(valid_until) if now < valid_until => {}
            _ => return Err(Error::CodeExpired),
        }

        if record.verification_code.as_deref() != Some(code) {
            return Err(Error::CodeMismatch);
        }

        let promoted = self
            .profiles
            .promote_verified(uid)
            .await
            .map_err(Error::Transient)?;
        if !promoted {
            // Another submission won the race between our read and this write.
            return Err(Error::AlreadyVerified);
        }
        info!(user.id = %uid, "account verified");

        self.sync_verified_identity(uid).await
    }

    /// Bring the identity provider in line with a just-verified record.
    async fn sync_verified_identity(&self, uid: &str) -> Result<(), Error> {
        let update = IdentityUpdate {
            email_verified: Some(true),
            ..IdentityUpdate::default()
        };
        if let Err(err) = self.identity.update_profile(uid, update).await {
            return Err(Error::Inconsistent(format!(
                "account verified but identity flag update failed: {err}"
            )));
        }

        let identity = self.identity.get_by_id(uid).await.map_err(|err| {
            Error::Inconsistent(format!(
                "account verified but identity claims could not be read: {err}"
            ))
        })?;
        let mut claims = identity.claims;
        claims.role = Some("member".to_string());
        self.identity.set_claims(uid, claims).await.map_err(|err| {
            Error::Inconsistent(format!(
                "account verified but identity claims update failed: {err}"
            ))
        })
    }

    /// Issue a fresh code for a pending account whose previous code expired.
    /// Returns the new validity deadline.
    ///
    /// # Errors
    /// `NotFound` when no profile record exists, `AlreadyVerified` for a
    /// verified account, `CodeStillValid` while the previous window is open.
    pub async fn resend(&self, uid: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
        let record = self
            .profiles
            .get(uid)
            .await
            .map_err(Error::Transient)?
            .ok_or(Error::NotFound("profile"))?;

        if record.verified {
            return Err(Error::AlreadyVerified);
        }
        if let Some(valid_until) = record.code_valid_until {
            if now < valid_until {
                return Err(Error::CodeStillValid);
            }
        }

        let code = generate_code();
        let valid_until = now + self.config.code_ttl();
        self.profiles
            .set_code(uid, &code, valid_until)
            .await
            .map_err(Error::Transient)?;

        if let Err(err) = self
            .mailer
            .send(render_verification_email(&code, &record.email))
            .await
        {
            warn!(user.id = %uid, "failed to send verification email: {err}");
        }

        Ok(valid_until)
    }
}
