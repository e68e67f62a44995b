//! Password-reset flow: emailed signed token, persisted single-use ticket.
//!
//! The signed token proves possession of the mailbox; the ticket pins each
//! token to the latest request per email and records consumption. A token is
//! honored only while it matches the stored ticket, is unconsumed, and is
//! inside its window. The ticket is consumed before the password changes, so
//! a token can never change a password twice even when the second attempt
//! races the first.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::config::GatewayConfig;
use crate::core::error::Error;
use crate::core::token::TokenCodec;
use crate::email::{render_reset_email, EmailSender};
use crate::identity::IdentityProvider;
use crate::store::{ResetTicket, ResetTicketStore};

pub struct ResetFlow {
    identity: Arc<dyn IdentityProvider>,
    tickets: ResetTicketStore,
    codec: TokenCodec,
    mailer: Arc<dyn EmailSender>,
    config: GatewayConfig,
}

impl ResetFlow {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        tickets: ResetTicketStore,
        codec: TokenCodec,
        mailer: Arc<dyn EmailSender>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            identity,
            tickets,
            codec,
            mailer,
            config,
        }
    }

    /// Issue a reset token for the account behind `email` and mail the reset
    /// link. The new ticket overwrites any earlier one for the same email,
    /// which invalidates the earlier token.
    ///
    /// # Errors
    /// `NotFound` when no identity has that email.
    pub async fn request_reset(&self, email: &str, now: DateTime<Utc>) -> Result<(), Error> {
        let identity = self.identity.get_by_email(email).await?;

        let token = self
            .codec
            .issue(&identity.email, &identity.uid, now, self.config.reset_ttl())?;
        let ticket = ResetTicket {
            email: identity.email.clone(),
            reset_token: token.clone(),
            expires_at: now + self.config.reset_ttl(),
            consumed_at: None,
        };
        self.tickets.put(&ticket).await.map_err(Error::Transient)?;
        info!(user.id = %identity.uid, "reset ticket issued");

        if let Err(err) = self
            .mailer
            .send(render_reset_email(
                &self.config.reset_url(&token),
                &identity.email,
            ))
            .await
        {
            warn!(user.id = %identity.uid, "failed to send reset email: {err}");
        }
        Ok(())
    }

    /// Redeem a reset token and set a new password. The ticket is consumed
    /// first; only the consumer proceeds to the password change.
    ///
    /// # Errors
    /// `TokenInvalid`/`TokenExpired` from signature or window checks,
    /// `TokenNotFound` when no live ticket matches (including a superseded
    /// token), `TokenConsumed` on reuse, `Inconsistent` when the ticket was
    /// consumed but the password change failed.
    pub async fn complete_reset(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        let claims = self.codec.verify(token, now)?;

        let ticket = self
            .tickets
            .get(&claims.email)
            .await
            .map_err(Error::Transient)?
            .ok_or(Error::TokenNotFound)?;

        // A newer request replaced this ticket; the presented token is dead.
        if ticket.reset_token != token {
            return Err(Error::TokenNotFound);
        }
        if ticket.consumed_at.is_some() {
            return Err(Error::TokenConsumed);
        }
        if now >= ticket.expires_at {
            return Err(Error::TokenExpired);
        }

        let consumed = self
            .tickets
            .consume(&claims.email, now)
            .await
            .map_err(Error::Transient)?;
        if !consumed {
            return Err(Error::TokenConsumed);
        }

        self.identity
            .update_password(&claims.uid, new_password)
            .await
            .map_err(|err| {
                Error::Inconsistent(format!(
                    "reset ticket consumed but password update failed: {err}"
                ))
            })?;
        info!(user.id = %claims.uid, "password reset completed");
        Ok(())
    }
}
