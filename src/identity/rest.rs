//! REST identity provider client (identity-toolkit style API).
//!
//! Custom claims ride in the provider's `customAttributes` field as a JSON
//! string; this adapter is the only place that encoding is visible.

use anyhow::{anyhow, Context};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{info_span, Instrument};

use super::{
    CustomClaims, Identity, IdentityProvider, IdentityUpdate, ProviderError, SessionClaims,
    SignedInSession,
};

pub struct RestIdentityProvider {
    base_url: String,
    api_key: SecretString,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    display_name: Option<String>,
    photo_url: Option<String>,
    custom_attributes: Option<String>,
}

impl UserRecord {
    fn claims(&self) -> CustomClaims {
        self.custom_attributes
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    fn into_identity(self) -> Identity {
        let claims = self.claims();
        Identity {
            uid: self.local_id,
            email: self.email,
            email_verified: self.email_verified,
            display_name: self.display_name,
            photo_url: self.photo_url,
            claims,
        }
    }
}

impl RestIdentityProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: String, api_key: SecretString) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build identity provider HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1/accounts:{action}?key={}",
            self.base_url,
            self.api_key.expose_secret()
        )
    }

    /// POST a JSON body and decode the success type, translating the
    /// provider's error envelope into a `ProviderError`.
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let span = info_span!("identity.call", provider.action = action);
        async {
            let response = self
                .client
                .post(self.endpoint(action))
                .json(&body)
                .send()
                .await
                .context("identity provider request failed")?;

            let status = response.status();
            let text = response
                .text()
                .await
                .context("failed to read identity provider response")?;

            if !status.is_success() {
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .map(|body| body.error.message)
                    .unwrap_or_else(|_| format!("status {status}"));
                return Err(translate_error(&message));
            }

            serde_json::from_str(&text)
                .context("failed to decode identity provider response")
                .map_err(ProviderError::Transport)
        }
        .instrument(span)
        .await
    }

    async fn lookup(&self, body: serde_json::Value) -> Result<UserRecord, ProviderError> {
        let response: LookupResponse = self.call("lookup", body).await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or(ProviderError::NotFound)
    }
}

fn translate_error(message: &str) -> ProviderError {
    match message {
        "EMAIL_EXISTS" => ProviderError::EmailExists,
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => ProviderError::NotFound,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => ProviderError::InvalidCredentials,
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" => ProviderError::InvalidToken,
        other => ProviderError::Transport(anyhow!("identity provider error: {other}")),
    }
}

#[async_trait::async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderError> {
        let response: SignUpResponse = self
            .call(
                "signUp",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        Ok(Identity {
            uid: response.local_id,
            email: response.email,
            email_verified: false,
            display_name: None,
            photo_url: None,
            claims: CustomClaims::default(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInSession, ProviderError> {
        let response: SignInResponse = self
            .call(
                "signInWithPassword",
                json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        Ok(SignedInSession {
            uid: response.local_id,
            email: response.email,
            token: response.id_token,
        })
    }

    async fn get_by_email(&self, email: &str) -> Result<Identity, ProviderError> {
        let record = self.lookup(json!({ "email": [email] })).await?;
        Ok(record.into_identity())
    }

    async fn get_by_id(&self, uid: &str) -> Result<Identity, ProviderError> {
        let record = self.lookup(json!({ "localId": [uid] })).await?;
        Ok(record.into_identity())
    }

    async fn update_password(&self, uid: &str, new_password: &str) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .call("update", json!({ "localId": uid, "password": new_password }))
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        uid: &str,
        update: IdentityUpdate,
    ) -> Result<(), ProviderError> {
        let mut fields = serde_json::Map::new();
        fields.insert("localId".to_string(), json!(uid));
        if let Some(display_name) = update.display_name {
            fields.insert("displayName".to_string(), json!(display_name));
        }
        if let Some(photo_url) = update.photo_url {
            fields.insert("photoUrl".to_string(), json!(photo_url));
        }
        if let Some(email_verified) = update.email_verified {
            fields.insert("emailVerified".to_string(), json!(email_verified));
        }
        let _: serde_json::Value = self.call("update", serde_json::Value::Object(fields)).await?;
        Ok(())
    }

    async fn set_claims(&self, uid: &str, claims: CustomClaims) -> Result<(), ProviderError> {
        let encoded = serde_json::to_string(&claims)
            .context("failed to encode custom claims")
            .map_err(ProviderError::Transport)?;
        let _: serde_json::Value = self
            .call("update", json!({ "localId": uid, "customAttributes": encoded }))
            .await?;
        Ok(())
    }

    async fn verify_session_token(&self, token: &str) -> Result<SessionClaims, ProviderError> {
        let record = self
            .lookup(json!({ "idToken": token }))
            .await
            .map_err(|err| match err {
                // A token that resolves to no user is an invalid token, not a
                // missing identity.
                ProviderError::NotFound => ProviderError::InvalidToken,
                other => other,
            })?;
        let claims = record.claims();
        Ok(SessionClaims {
            uid: record.local_id,
            email: Some(record.email),
            email_verified: record.email_verified,
            role: claims.role,
            name: claims.name,
            picture: claims.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_error_covers_known_codes() {
        assert!(matches!(
            translate_error("EMAIL_EXISTS"),
            ProviderError::EmailExists
        ));
        assert!(matches!(
            translate_error("EMAIL_NOT_FOUND"),
            ProviderError::NotFound
        ));
        assert!(matches!(
            translate_error("INVALID_PASSWORD"),
            ProviderError::InvalidCredentials
        ));
        assert!(matches!(
            translate_error("INVALID_ID_TOKEN"),
            ProviderError::InvalidToken
        ));
        assert!(matches!(
            translate_error("SOMETHING_ELSE"),
            ProviderError::Transport(_)
        ));
    }

    #[test]
    fn user_record_decodes_custom_attributes() -> anyhow::Result<()> {
        let record: UserRecord = serde_json::from_value(json!({
            "localId": "uid-1",
            "email": "a@x.com",
            "emailVerified": true,
            "displayName": "Alice",
            "customAttributes": "{\"role\":\"member\",\"name\":\"Alice\"}",
        }))?;
        let claims = record.claims();
        assert_eq!(claims.role.as_deref(), Some("member"));
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        assert_eq!(claims.picture, None);

        let identity = record.into_identity();
        assert_eq!(identity.uid, "uid-1");
        assert!(identity.email_verified);
        Ok(())
    }

    #[test]
    fn malformed_custom_attributes_fall_back_to_empty_claims() -> anyhow::Result<()> {
        let record: UserRecord = serde_json::from_value(json!({
            "localId": "uid-1",
            "email": "a@x.com",
            "customAttributes": "not json",
        }))?;
        assert_eq!(record.claims(), CustomClaims::default());
        Ok(())
    }
}
