//! Outbound email: sender contract, delivery backends, and the two
//! transactional templates the gateway sends.
//!
//! Delivery is best-effort from the core's point of view; callers log send
//! failures and carry on, so a down relay never blocks registration or a
//! password reset request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, info_span, Instrument};

#[derive(Clone, Debug, Serialize)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body_html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// Logs the message instead of delivering it. Used in dev mode.
#[derive(Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        info!(
            email.to = %message.to_email,
            email.subject = %message.subject,
            "email delivery skipped, logging only"
        );
        Ok(())
    }
}

/// Delivers through an HTTP mail relay: POST the message as JSON to the
/// relay's `/v1/send` endpoint.
pub struct RelayEmailSender {
    endpoint: String,
    client: Client,
}

impl RelayEmailSender {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build mail relay HTTP client")?;
        Ok(Self {
            endpoint: format!("{}/v1/send", base_url.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait]
impl EmailSender for RelayEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let span = info_span!("email.send", email.to = %message.to_email);
        async {
            self.client
                .post(&self.endpoint)
                .json(&message)
                .send()
                .await
                .context("mail relay request failed")?
                .error_for_status()
                .context("mail relay rejected the message")?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

/// Verification-code email body.
#[must_use]
pub fn render_verification_email(code: &str, email: &str) -> EmailMessage {
    let year = Utc::now().year();
    let body_html = format!(
        "<html><body>\
         <h2>Confirm your email</h2>\
         <p>Use this code to verify your account:</p>\
         <p style=\"font-size:24px;letter-spacing:4px\"><strong>{code}</strong></p>\
         <p>The code expires in 30 minutes. If you did not create an account, \
         you can ignore this message.</p>\
         <p style=\"color:#888\">&copy; {year}</p>\
         </body></html>"
    );
    EmailMessage {
        to_email: email.to_string(),
        subject: "Verify your email".to_string(),
        body_html,
    }
}

/// Password-reset email body pointing at the frontend reset page.
#[must_use]
pub fn render_reset_email(reset_link: &str, email: &str) -> EmailMessage {
    let year = Utc::now().year();
    let body_html = format!(
        "<html><body>\
         <h2>Reset your password</h2>\
         <p>Follow this link to choose a new password:</p>\
         <p><a href=\"{reset_link}\">{reset_link}</a></p>\
         <p>The link expires in 30 minutes. If you did not request a reset, \
         you can ignore this message.</p>\
         <p style=\"color:#888\">&copy; {year}</p>\
         </body></html>"
    );
    EmailMessage {
        to_email: email.to_string(),
        subject: "Reset your password".to_string(),
        body_html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_template_embeds_code_and_recipient() {
        let message = render_verification_email("042713", "a@x.com");
        assert_eq!(message.to_email, "a@x.com");
        assert!(message.body_html.contains("042713"));
        assert!(message.subject.contains("Verify"));
    }

    #[test]
    fn reset_template_embeds_link() {
        let link = "http://localhost:3000/reset-password?token=abc";
        let message = render_reset_email(link, "a@x.com");
        assert!(message.body_html.contains(link));
        assert!(message.subject.contains("Reset"));
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() -> Result<()> {
        LogEmailSender
            .send(render_verification_email("123456", "a@x.com"))
            .await
    }
}
