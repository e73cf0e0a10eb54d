use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::models::auth::AuthRedirectAttempt;

/// Well-known keys shared with the UI layer. All tabs of the same origin
/// see the same store, so writers must assume racing readers.
pub mod keys {
    pub const REDIRECT_ATTEMPT: &str = "authRedirectAttempt";
    pub const MODEL_IMAGE: &str = "modelImage";
    pub const GARMENTS: &str = "tryonProducts";
    pub const LAST_RESULT: &str = "tryonResult";
    pub const LAST_GARMENT_NAME: &str = "tryonGarmentName";
    pub const ONBOARDING_SHOWN: &str = "onboardingShown";
}

/// Origin-scoped string key-value storage. Not guaranteed durable.
pub trait KeyValueCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    /// Set only if the key is currently absent; returns whether the write
    /// happened.
    fn set_nx(&self, key: &str, value: &str) -> Result<bool, CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-memory store with an optional byte budget, mirroring the quota
/// behavior of browser local storage.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    capacity: Option<usize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: Some(capacity),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fits(&self, entries: &HashMap<String, String>, key: &str, value: &str) -> bool {
        let Some(capacity) = self.capacity else {
            return true;
        };
        let used: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        used + key.len() + value.len() <= capacity
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.lock();
        if !self.fits(&entries, key, value) {
            return Err(CacheError::QuotaExceeded);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_nx(&self, key: &str, value: &str) -> Result<bool, CacheError> {
        let mut entries = self.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        if !self.fits(&entries, key, value) {
            return Err(CacheError::QuotaExceeded);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Single-slot owner marker for an in-flight redirect attempt. A
/// pre-existing value belongs to another attempt and is never overwritten;
/// acquisition is compare-and-set, not check-then-write.
pub struct AttemptSlot {
    cache: Arc<dyn KeyValueCache>,
}

impl AttemptSlot {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }

    pub fn try_acquire(&self, attempt: &AuthRedirectAttempt) -> Result<bool, CacheError> {
        let payload = serde_json::to_string(attempt)?;
        self.cache.set_nx(keys::REDIRECT_ATTEMPT, &payload)
    }

    pub fn load(&self) -> Result<Option<AuthRedirectAttempt>, CacheError> {
        let Some(raw) = self.cache.get(keys::REDIRECT_ATTEMPT)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(attempt) => Ok(Some(attempt)),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable redirect attempt");
                self.cache.delete(keys::REDIRECT_ATTEMPT)?;
                Ok(None)
            }
        }
    }

    pub fn release(&self) -> Result<(), CacheError> {
        self.cache.delete(keys::REDIRECT_ATTEMPT)
    }
}

/// A garment selected for try-on, as cached between navigations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Garment {
    pub id: Uuid,
    pub name: String,
    pub image: String,
}

/// Newest entries kept when the garment list hits the storage budget.
const MAX_GARMENTS: usize = 3;

/// Typed helpers over the shared cache for in-flight selections, the last
/// job result, and the onboarding marker.
pub struct SessionCache {
    cache: Arc<dyn KeyValueCache>,
}

impl SessionCache {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }

    pub fn model_image(&self) -> Result<Option<String>, CacheError> {
        self.cache.get(keys::MODEL_IMAGE)
    }

    pub fn set_model_image(&self, data_url: &str) -> Result<(), CacheError> {
        self.cache.set(keys::MODEL_IMAGE, data_url)
    }

    pub fn clear_model_image(&self) -> Result<(), CacheError> {
        self.cache.delete(keys::MODEL_IMAGE)
    }

    pub fn garments(&self) -> Result<Vec<Garment>, CacheError> {
        let Some(raw) = self.cache.get(keys::GARMENTS)? else {
            return Ok(Vec::new());
        };
        // An unreadable list is treated as empty rather than fatal.
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    }

    /// Append a garment; on quota pressure the oldest entries are dropped
    /// and the write retried once.
    pub fn push_garment(&self, garment: Garment) -> Result<(), CacheError> {
        let mut garments = self.garments()?;
        garments.push(garment);
        match self.save_garments(&garments) {
            Err(CacheError::QuotaExceeded) if garments.len() > MAX_GARMENTS => {
                let trimmed = garments.split_off(garments.len() - MAX_GARMENTS);
                self.save_garments(&trimmed)
            }
            other => other,
        }
    }

    pub fn remove_garment(&self, index: usize) -> Result<(), CacheError> {
        let mut garments = self.garments()?;
        if index < garments.len() {
            garments.remove(index);
            self.save_garments(&garments)?;
        }
        Ok(())
    }

    pub fn set_last_result(&self, result_url: &str, garment_name: &str) -> Result<(), CacheError> {
        self.cache.set(keys::LAST_RESULT, result_url)?;
        self.cache.set(keys::LAST_GARMENT_NAME, garment_name)
    }

    pub fn last_result(&self) -> Result<Option<String>, CacheError> {
        self.cache.get(keys::LAST_RESULT)
    }

    pub fn mark_onboarding_shown(&self) -> Result<(), CacheError> {
        self.cache.set(keys::ONBOARDING_SHOWN, "true")
    }

    pub fn onboarding_shown(&self) -> Result<bool, CacheError> {
        Ok(self.cache.get(keys::ONBOARDING_SHOWN)?.is_some())
    }

    fn save_garments(&self, garments: &[Garment]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(garments)?;
        self.cache.set(keys::GARMENTS, &payload)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
