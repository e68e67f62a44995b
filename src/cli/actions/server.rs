use crate::api;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::core::{Gateway, GatewayConfig, TokenCodec};
use crate::email::{EmailSender, LogEmailSender, RelayEmailSender};
use crate::identity::{IdentityProvider, MemoryIdentityProvider, RestIdentityProvider};
use crate::store::{DocumentStore, MemoryDocumentStore, RestDocumentStore};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::warn;
use url::Url;

fn checked_url(value: String, flag: &str) -> Result<String> {
    Url::parse(&value).with_context(|| format!("invalid {flag}: {value}"))?;
    Ok(value)
}

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            provider_url,
            docstore_url,
            frontend_url,
            mail_relay_url,
            dev,
        } => {
            let identity: Arc<dyn IdentityProvider> = if dev {
                warn!("dev mode: in-memory identity provider, state is not persisted");
                Arc::new(MemoryIdentityProvider::new())
            } else {
                let url = provider_url.ok_or_else(|| anyhow!("--provider-url is required"))?;
                Arc::new(RestIdentityProvider::new(
                    checked_url(url, "--provider-url")?,
                    globals.provider_api_key.clone(),
                )?)
            };

            let store: Arc<dyn DocumentStore> = if dev {
                Arc::new(MemoryDocumentStore::new())
            } else {
                let url = docstore_url.ok_or_else(|| anyhow!("--docstore-url is required"))?;
                Arc::new(RestDocumentStore::new(checked_url(url, "--docstore-url")?)?)
            };

            let mailer: Arc<dyn EmailSender> = match mail_relay_url {
                Some(url) => Arc::new(RelayEmailSender::new(checked_url(
                    url,
                    "--mail-relay-url",
                )?)?),
                None => Arc::new(LogEmailSender),
            };

            let config = GatewayConfig::new(checked_url(frontend_url, "--frontend-url")?);
            let codec = TokenCodec::new(globals.secret_key.clone());
            let gateway = Arc::new(Gateway::new(identity, store, mailer, codec, config));

            api::new(port, gateway).await?;
        }
    }

    Ok(())
}
