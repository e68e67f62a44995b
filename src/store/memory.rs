//! In-memory document store for local development and tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{Document, DocumentStore, MergePolicy, Precondition};

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, HashMap<String, Document>>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply(existing: &mut Document, fields: Document, policy: MergePolicy) {
    match policy {
        MergePolicy::Overwrite => *existing = fields,
        MergePolicy::Merge => {
            for (key, value) in fields {
                if value.is_null() {
                    existing.remove(&key);
                } else {
                    existing.insert(key, value);
                }
            }
        }
    }
}

fn holds(doc: &Document, precondition: &Precondition) -> bool {
    match precondition {
        Precondition::FieldEquals(field, expected) => doc.get(*field) == Some(expected),
        Precondition::FieldAbsent(field) => !doc.contains_key(*field),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        policy: MergePolicy,
    ) -> Result<()> {
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let existing = docs.entry(key.to_string()).or_default();
        apply(existing, fields, policy);
        Ok(())
    }

    async fn set_if(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        policy: MergePolicy,
        precondition: Precondition,
    ) -> Result<bool> {
        // Check and write under one lock hold, so concurrent writers serialize.
        let mut collections = self.collections.lock().await;
        let Some(existing) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(key))
        else {
            return Ok(false);
        };
        if !holds(existing, &precondition) {
            return Ok(false);
        }
        apply(existing, fields, policy);
        Ok(true)
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let mut collections = self.collections.lock().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }
}
