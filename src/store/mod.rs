//! Document store contract plus the typed record adapters built on it.
//!
//! The store holds two collections: `users` (per-identity profile and
//! verification state, keyed by uid) and `password_resets` (reset tickets,
//! keyed by email). The raw [`DocumentStore`] trait speaks JSON documents;
//! [`ProfileStore`] and [`ResetTicketStore`] are the only places that know
//! the field layout.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod memory;
pub mod rest;

pub use memory::MemoryDocumentStore;
pub use rest::RestDocumentStore;

pub const PROFILES: &str = "users";
pub const RESET_TICKETS: &str = "password_resets";

pub type Document = serde_json::Map<String, Value>;

/// Field-level merge vs full document overwrite. Under `Merge`, an explicit
/// JSON `null` removes the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    Merge,
    Overwrite,
}

/// Guard for a conditional write. The store must evaluate the precondition
/// and apply the write atomically with respect to other writers of the same
/// document.
#[derive(Clone, Debug)]
pub enum Precondition {
    FieldEquals(&'static str, Value),
    FieldAbsent(&'static str),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        policy: MergePolicy,
    ) -> Result<()>;

    /// Conditional write. Returns `false` (without writing) when the document
    /// is missing or the precondition does not hold.
    async fn set_if(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        policy: MergePolicy,
        precondition: Precondition,
    ) -> Result<bool>;

    async fn delete(&self, collection: &str, key: &str) -> Result<()>;
}

/// Per-user verification/profile record. `verified == true` implies the code
/// fields are cleared; a verified record is never re-promoted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub email: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rut: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persisted binding of a reset token to an email, making the token
/// single-use. The latest ticket per email overwrites any prior one.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTicket {
    pub email: String,
    pub reset_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<DateTime<Utc>>,
}

fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value).context("failed to serialize record")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("record serialized to non-object JSON: {other}"),
    }
}

fn from_document<T: for<'de> Deserialize<'de>>(doc: Document) -> Result<T> {
    serde_json::from_value(Value::Object(doc)).context("failed to deserialize record")
}

/// Typed adapter over the `users` collection.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn DocumentStore>,
}

impl ProfileStore {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, uid: &str) -> Result<Option<ProfileRecord>> {
        let doc = self.store.get(PROFILES, uid).await?;
        doc.map(from_document).transpose()
    }

    /// Write a full record, replacing whatever was there.
    pub async fn put(&self, uid: &str, record: &ProfileRecord) -> Result<()> {
        self.store
            .set(PROFILES, uid, to_document(record)?, MergePolicy::Overwrite)
            .await
    }

    /// Merge arbitrary profile fields into an existing record.
    pub async fn merge(&self, uid: &str, fields: Document) -> Result<()> {
        self.store
            .set(PROFILES, uid, fields, MergePolicy::Merge)
            .await
    }

    /// Store a fresh verification code and its validity window.
    pub async fn set_code(
        &self,
        uid: &str,
        code: &str,
        valid_until: DateTime<Utc>,
    ) -> Result<()> {
        let mut fields = Document::new();
        fields.insert("verificationCode".to_string(), Value::from(code));
        fields.insert(
            "codeValidUntil".to_string(),
            serde_json::to_value(valid_until)?,
        );
        self.merge(uid, fields).await
    }

    /// Promote `Pending -> Verified` with a conditional write keyed on the
    /// pre-transition state, so exactly one of two concurrent verifiers wins.
    /// Returns `false` for the loser.
    pub async fn promote_verified(&self, uid: &str) -> Result<bool> {
        let mut fields = Document::new();
        fields.insert("verified".to_string(), Value::Bool(true));
        // Merge-null clears the code fields; a verified record keeps neither.
        fields.insert("verificationCode".to_string(), Value::Null);
        fields.insert("codeValidUntil".to_string(), Value::Null);
        self.store
            .set_if(
                PROFILES,
                uid,
                fields,
                MergePolicy::Merge,
                Precondition::FieldEquals("verified", Value::Bool(false)),
            )
            .await
    }
}

/// Typed adapter over the `password_resets` collection (keyed by email).
#[derive(Clone)]
pub struct ResetTicketStore {
    store: Arc<dyn DocumentStore>,
}

impl ResetTicketStore {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, email: &str) -> Result<Option<ResetTicket>> {
        let doc = self.store.get(RESET_TICKETS, email).await?;
        doc.map(from_document).transpose()
    }

    /// Persist a ticket, overwriting (and thereby invalidating) any prior
    /// ticket for the same email.
    pub async fn put(&self, ticket: &ResetTicket) -> Result<()> {
        self.store
            .set(
                RESET_TICKETS,
                &ticket.email,
                to_document(ticket)?,
                MergePolicy::Overwrite,
            )
            .await
    }

    /// Mark the ticket consumed, guarded on it not being consumed already.
    /// Returns `false` when another request consumed it first.
    pub async fn consume(&self, email: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut fields = Document::new();
        fields.insert("consumedAt".to_string(), serde_json::to_value(now)?);
        self.store
            .set_if(
                RESET_TICKETS,
                email,
                fields,
                MergePolicy::Merge,
                Precondition::FieldAbsent("consumedAt"),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_record(now: DateTime<Utc>) -> ProfileRecord {
        ProfileRecord {
            email: "a@x.com".to_string(),
            verified: false,
            verification_code: Some("123456".to_string()),
            code_valid_until: Some(now + chrono::Duration::minutes(30)),
            display_name: None,
            photo_url: None,
            rut: None,
            birthdate: None,
            created_at: now,
        }
    }

    #[test]
    fn profile_record_uses_original_wire_names() -> Result<()> {
        let now = Utc::now();
        let doc = to_document(&pending_record(now))?;
        assert!(doc.contains_key("verificationCode"));
        assert!(doc.contains_key("codeValidUntil"));
        assert!(doc.contains_key("createdAt"));
        assert!(!doc.contains_key("photoURL"));
        Ok(())
    }

    #[test]
    fn cleared_code_fields_round_trip_as_absent() -> Result<()> {
        let now = Utc::now();
        let mut record = pending_record(now);
        record.verified = true;
        record.verification_code = None;
        record.code_valid_until = None;

        let doc = to_document(&record)?;
        assert!(!doc.contains_key("verificationCode"));

        let decoded: ProfileRecord = from_document(doc)?;
        assert!(decoded.verified);
        assert_eq!(decoded.verification_code, None);
        Ok(())
    }

    #[tokio::test]
    async fn promote_verified_is_single_shot() -> Result<()> {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let profiles = ProfileStore::new(store);
        let now = Utc::now();
        profiles.put("uid-1", &pending_record(now)).await?;

        assert!(profiles.promote_verified("uid-1").await?);
        // Second promotion finds verified == true and loses.
        assert!(!profiles.promote_verified("uid-1").await?);

        let record = profiles.get("uid-1").await?.context("record missing")?;
        assert!(record.verified);
        assert_eq!(record.verification_code, None);
        assert_eq!(record.code_valid_until, None);
        Ok(())
    }

    #[tokio::test]
    async fn ticket_consume_is_single_shot() -> Result<()> {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let tickets = ResetTicketStore::new(store);
        let now = Utc::now();
        tickets
            .put(&ResetTicket {
                email: "a@x.com".to_string(),
                reset_token: "tok".to_string(),
                expires_at: now + chrono::Duration::minutes(30),
                consumed_at: None,
            })
            .await?;

        assert!(tickets.consume("a@x.com", now).await?);
        assert!(!tickets.consume("a@x.com", now).await?);

        let ticket = tickets.get("a@x.com").await?.context("ticket missing")?;
        assert!(ticket.consumed_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn newer_ticket_overwrites_prior() -> Result<()> {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let tickets = ResetTicketStore::new(store);
        let now = Utc::now();
        for token in ["first", "second"] {
            tickets
                .put(&ResetTicket {
                    email: "a@x.com".to_string(),
                    reset_token: token.to_string(),
                    expires_at: now + chrono::Duration::minutes(30),
                    consumed_at: None,
                })
                .await?;
        }
        let ticket = tickets.get("a@x.com").await?.context("ticket missing")?;
        assert_eq!(ticket.reset_token, "second");
        Ok(())
    }
}
