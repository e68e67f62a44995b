//! Profile updates across the document store and the identity mirror.
//!
//! The document store record is written first and is the source of truth.
//! Display name and photo also live on the identity (and from there in
//! session-token claims), so edits touching them are mirrored; a failed
//! mirror write after a successful store write surfaces as `Inconsistent`.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::core::error::Error;
use crate::identity::{IdentityProvider, IdentityUpdate};
use crate::store::{Document, ProfileRecord, ProfileStore};

/// Fields a user may edit. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub rut: Option<String>,
    pub birthdate: Option<String>,
}

impl ProfileChanges {
    fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.photo_url.is_none()
            && self.rut.is_none()
            && self.birthdate.is_none()
    }

    /// Whether any changed field is mirrored on the identity.
    fn touches_mirror(&self) -> bool {
        self.display_name.is_some() || self.photo_url.is_some()
    }

    fn as_document(&self) -> Document {
        let mut fields = Document::new();
        if let Some(display_name) = &self.display_name {
            fields.insert("displayName".to_string(), Value::from(display_name.clone()));
        }
        if let Some(photo_url) = &self.photo_url {
            fields.insert("photoURL".to_string(), Value::from(photo_url.clone()));
        }
        if let Some(rut) = &self.rut {
            fields.insert("rut".to_string(), Value::from(rut.clone()));
        }
        if let Some(birthdate) = &self.birthdate {
            fields.insert("birthdate".to_string(), Value::from(birthdate.clone()));
        }
        fields
    }
}

pub struct ProfileService {
    profiles: ProfileStore,
    identity: Arc<dyn IdentityProvider>,
}

impl ProfileService {
    #[must_use]
    pub fn new(profiles: ProfileStore, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { profiles, identity }
    }

    /// Fetch the profile record for an account.
    ///
    /// # Errors
    /// `NotFound` when no record exists.
    pub async fn get(&self, uid: &str) -> Result<ProfileRecord, Error> {
        self.profiles
            .get(uid)
            .await
            .map_err(Error::Transient)?
            .ok_or(Error::NotFound("profile"))
    }

    /// Apply a partial profile update and return the resulting record.
    ///
    /// # Errors
    /// `NotFound` when no record exists, `Inconsistent` when the store write
    /// landed but the identity mirror update failed.
    pub async fn update(
        &self,
        uid: &str,
        changes: ProfileChanges,
    ) -> Result<ProfileRecord, Error> {
        // No-op updates short-circuit to a plain read.
        if changes.is_empty() {
            return self.get(uid).await;
        }

        if self
            .profiles
            .get(uid)
            .await
            .map_err(Error::Transient)?
            .is_none()
        {
            return Err(Error::NotFound("profile"));
        }

        self.profiles
            .merge(uid, changes.as_document())
            .await
            .map_err(Error::Transient)?;

        if changes.touches_mirror() {
            let update = IdentityUpdate {
                display_name: changes.display_name.clone(),
                photo_url: changes.photo_url.clone(),
                email_verified: None,
            };
            self.identity.update_profile(uid, update).await.map_err(|err| {
                Error::Inconsistent(format!(
                    "profile stored but identity mirror update failed: {err}"
                ))
            })?;
        }
        info!(user.id = %uid, "profile updated");

        self.get(uid).await
    }
}
