//! REST document store client.
//!
//! Documents live at `{base}/v1/{collection}/{key}`. `PUT` overwrites, `PATCH`
//! merges (a JSON `null` removes the field), and conditional writes carry the
//! precondition as query parameters; the server answers `409 Conflict` when
//! the precondition does not hold.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{info_span, Instrument};

use super::{Document, DocumentStore, MergePolicy, Precondition};

pub struct RestDocumentStore {
    base_url: String,
    client: Client,
}

impl RestDocumentStore {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build document store HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, collection: &str, key: &str) -> String {
        format!("{}/v1/{collection}/{key}", self.base_url)
    }

    fn write_method(policy: MergePolicy) -> Method {
        match policy {
            MergePolicy::Merge => Method::PATCH,
            MergePolicy::Overwrite => Method::PUT,
        }
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let span = info_span!("docstore.get", store.collection = collection);
        async {
            let response = self
                .client
                .get(self.url(collection, key))
                .send()
                .await
                .context("document store request failed")?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = response
                .error_for_status()
                .context("document store get failed")?;
            let value: Value = response
                .json()
                .await
                .context("failed to decode document")?;
            match value {
                Value::Object(map) => Ok(Some(map)),
                other => anyhow::bail!("document store returned non-object JSON: {other}"),
            }
        }
        .instrument(span)
        .await
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        policy: MergePolicy,
    ) -> Result<()> {
        let span = info_span!("docstore.set", store.collection = collection);
        async {
            self.client
                .request(Self::write_method(policy), self.url(collection, key))
                .json(&Value::Object(fields))
                .send()
                .await
                .context("document store request failed")?
                .error_for_status()
                .context("document store write failed")?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn set_if(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        policy: MergePolicy,
        precondition: Precondition,
    ) -> Result<bool> {
        let span = info_span!("docstore.set_if", store.collection = collection);
        async {
            let mut request = self
                .client
                .request(Self::write_method(policy), self.url(collection, key))
                .json(&Value::Object(fields));
            request = match &precondition {
                Precondition::FieldEquals(field, expected) => {
                    let equals = expected.to_string();
                    request.query(&[("when", *field), ("equals", equals.as_str())])
                }
                Precondition::FieldAbsent(field) => request.query(&[("absent", *field)]),
            };
            let response = request
                .send()
                .await
                .context("document store request failed")?;
            // Precondition miss and missing document both surface as conflicts.
            if matches!(
                response.status(),
                StatusCode::CONFLICT | StatusCode::NOT_FOUND
            ) {
                return Ok(false);
            }
            response
                .error_for_status()
                .context("document store conditional write failed")?;
            Ok(true)
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let span = info_span!("docstore.delete", store.collection = collection);
        async {
            let response = self
                .client
                .delete(self.url(collection, key))
                .send()
                .await
                .context("document store request failed")?;
            // Deleting a missing document is not an error.
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(());
            }
            response
                .error_for_status()
                .context("document store delete failed")?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_have_no_double_slash() -> Result<()> {
        let store = RestDocumentStore::new("http://localhost:9000/".to_string())?;
        assert_eq!(
            store.url("users", "uid-1"),
            "http://localhost:9000/v1/users/uid-1"
        );
        Ok(())
    }

    #[test]
    fn merge_uses_patch_and_overwrite_uses_put() {
        assert_eq!(RestDocumentStore::write_method(MergePolicy::Merge), Method::PATCH);
        assert_eq!(
            RestDocumentStore::write_method(MergePolicy::Overwrite),
            Method::PUT
        );
    }
}
