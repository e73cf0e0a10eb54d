use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::profile::{ProfilePatch, UserProfile};

/// Consumed capability: the external identity/profile store, keyed by user
/// id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, ProfileError>;

    /// A profile document is created at most once per user id.
    async fn create(&self, user_id: &str, profile: UserProfile) -> Result<(), ProfileError>;

    /// Union semantics on the provider list; the photo is overwritten by
    /// the latest value; every other field is left untouched.
    async fn merge(&self, user_id: &str, patch: ProfilePatch) -> Result<(), ProfileError>;
}

/// Reference in-memory store, also used as the default binding until the
/// embedding app wires a real backend.
pub struct MemoryProfileStore {
    docs: Mutex<HashMap<String, UserProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, UserProfile>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, ProfileError> {
        Ok(self.lock().get(user_id).cloned())
    }

    async fn create(&self, user_id: &str, profile: UserProfile) -> Result<(), ProfileError> {
        let mut docs = self.lock();
        if docs.contains_key(user_id) {
            return Err(ProfileError::AlreadyExists(user_id.to_string()));
        }
        docs.insert(user_id.to_string(), profile);
        Ok(())
    }

    async fn merge(&self, user_id: &str, patch: ProfilePatch) -> Result<(), ProfileError> {
        let mut docs = self.lock();
        let doc = docs
            .get_mut(user_id)
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
        if let Some(photo_url) = patch.photo_url {
            doc.photo_url = Some(photo_url);
        }
        for provider in patch.providers {
            if !doc.providers.contains(&provider) {
                doc.providers.push(provider);
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile not found for user {0}")]
    NotFound(String),

    #[error("profile already exists for user {0}")]
    AlreadyExists(String),

    #[error("profile store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_profile() -> UserProfile {
        UserProfile {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            gender: "female".to_string(),
            email: Some("ada@example.com".to_string()),
            phone_number: None,
            photo_url: None,
            providers: vec!["password".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_is_once_per_user() {
        let store = MemoryProfileStore::new();
        store.create("u1", password_profile()).await.expect("create");
        assert!(matches!(
            store.create("u1", password_profile()).await,
            Err(ProfileError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_merge_unions_providers_and_keeps_other_fields() {
        let store = MemoryProfileStore::new();
        store.create("u1", password_profile()).await.expect("create");

        store
            .merge(
                "u1",
                ProfilePatch {
                    photo_url: Some("https://img.example/new.jpg".to_string()),
                    providers: vec!["google.com".to_string()],
                },
            )
            .await
            .expect("merge");

        let doc = store.get("u1").await.expect("get").expect("present");
        assert_eq!(
            doc.providers,
            vec!["password".to_string(), "google.com".to_string()]
        );
        assert_eq!(doc.photo_url.as_deref(), Some("https://img.example/new.jpg"));
        assert_eq!(doc.gender, "female");

        // Merging the same provider again stays a set.
        store
            .merge(
                "u1",
                ProfilePatch {
                    photo_url: None,
                    providers: vec!["google.com".to_string()],
                },
            )
            .await
            .expect("merge");
        let doc = store.get("u1").await.expect("get").expect("present");
        assert_eq!(doc.providers.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_missing_profile_errors() {
        let store = MemoryProfileStore::new();
        assert!(matches!(
            store.merge("ghost", ProfilePatch::default()).await,
            Err(ProfileError::NotFound(_))
        ));
    }
}
