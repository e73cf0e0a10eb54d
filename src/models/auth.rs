use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::AsRefStr;

/// Federated identity providers supported for sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthProvider {
    Google,
    Facebook,
}

impl AuthProvider {
    /// Provider id as stored in profile documents.
    pub fn provider_id(self) -> &'static str {
        match self {
            AuthProvider::Google => "google.com",
            AuthProvider::Facebook => "facebook.com",
        }
    }
}

/// Marker recorded immediately before navigating away to an identity
/// provider, used to reconcile state once the browser returns. At most one
/// attempt may be outstanding at a time (see `AttemptSlot`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRedirectAttempt {
    pub provider: AuthProvider,
    pub started_at: DateTime<Utc>,
    /// Browser origin at launch, to detect cross-origin landing mismatches.
    pub origin: String,
    pub path: String,
}

impl AuthRedirectAttempt {
    pub fn new(provider: AuthProvider, origin: &str, path: &str) -> Self {
        Self {
            provider,
            started_at: Utc::now(),
            origin: origin.to_string(),
            path: path.to_string(),
        }
    }

    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.started_at)
    }

    /// Past the expiry window the attempt is never acted upon.
    pub fn is_expired(&self, expiry: Duration) -> bool {
        match chrono::Duration::from_std(expiry) {
            Ok(limit) => self.age() >= limit,
            Err(_) => false,
        }
    }

    /// Young enough that the provider may still be handing the result back.
    pub fn is_recent(&self, window: Duration) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(limit) => self.age() < limit,
            Err(_) => true,
        }
    }
}

/// User identity as returned by the provider after popup or redirect
/// sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: Option<String>,
}

impl RedirectUser {
    pub fn provider_or_default(&self) -> &str {
        self.provider_id.as_deref().unwrap_or("google.com")
    }
}

/// Outcome emitted once per page load after reconciliation completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResolution {
    pub resolved: bool,
    pub user: Option<String>,
    pub error_message: Option<String>,
}

impl AuthResolution {
    pub fn resolved(user_id: &str) -> Self {
        Self {
            resolved: true,
            user: Some(user_id.to_string()),
            error_message: None,
        }
    }

    pub fn none() -> Self {
        Self {
            resolved: false,
            user: None,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            resolved: false,
            user: None,
            error_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_attempt_is_recent_and_not_expired() {
        let attempt = AuthRedirectAttempt::new(AuthProvider::Google, "https://app.test", "/auth/login");
        assert!(attempt.is_recent(Duration::from_secs(10)));
        assert!(!attempt.is_expired(Duration::from_secs(300)));
    }

    #[test]
    fn test_backdated_attempt_expires() {
        let mut attempt =
            AuthRedirectAttempt::new(AuthProvider::Facebook, "https://app.test", "/auth/login");
        attempt.started_at = Utc::now() - chrono::Duration::minutes(6);
        assert!(attempt.is_expired(Duration::from_secs(300)));
        assert!(!attempt.is_recent(Duration::from_secs(10)));
    }
}
