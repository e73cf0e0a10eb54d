use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::auth::RedirectUser;

/// Profile document keyed by user id, owned by the external profile store.
/// Created at most once per user; later social logins merge into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub providers: Vec<String>,
}

impl UserProfile {
    /// Initial profile for a first-time federated sign-in. First/last name
    /// are derived by splitting the provider display name on whitespace.
    pub fn from_redirect(user: &RedirectUser) -> Self {
        let (first_name, last_name) = split_display_name(user.display_name.as_deref());
        Self {
            first_name,
            last_name,
            gender: String::new(),
            email: user.email.clone(),
            phone_number: None,
            photo_url: user.photo_url.clone(),
            providers: vec![user.provider_or_default().to_string()],
        }
    }
}

/// First token becomes the first name, the rest joined with a space become
/// the last name; both default to empty.
pub fn split_display_name(name: Option<&str>) -> (String, String) {
    let Some(name) = name else {
        return (String::new(), String::new());
    };
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Partial update applied to an existing profile on a repeat social login.
/// Provider lists merge with union semantics; the photo is overwritten by
/// the latest provider value.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub photo_url: Option<String>,
    pub providers: Vec<String>,
}

impl ProfilePatch {
    pub fn from_redirect(user: &RedirectUser) -> Self {
        Self {
            photo_url: user.photo_url.clone(),
            providers: vec![user.provider_or_default().to_string()],
        }
    }
}

/// One completed try-on saved to the user's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnRecord {
    pub id: Uuid,
    pub human_image: String,
    pub garment_image: String,
    pub result_image: String,
    pub garment_name: String,
    pub garment_type: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_two_part_name() {
        assert_eq!(
            split_display_name(Some("Ada Lovelace")),
            ("Ada".to_string(), "Lovelace".to_string())
        );
    }

    #[test]
    fn test_split_multi_part_name_joins_remainder() {
        assert_eq!(
            split_display_name(Some("Maria del Carmen Ruiz")),
            ("Maria".to_string(), "del Carmen Ruiz".to_string())
        );
    }

    #[test]
    fn test_split_single_token() {
        assert_eq!(
            split_display_name(Some("Cher")),
            ("Cher".to_string(), String::new())
        );
    }

    #[test]
    fn test_split_missing_name_defaults_empty() {
        assert_eq!(split_display_name(None), (String::new(), String::new()));
    }

    #[test]
    fn test_profile_from_redirect_records_provider() {
        let user = RedirectUser {
            uid: "u1".to_string(),
            email: Some("ada@example.com".to_string()),
            display_name: Some("Ada Lovelace".to_string()),
            photo_url: Some("https://img.example/ada.jpg".to_string()),
            provider_id: Some("google.com".to_string()),
        };
        let profile = UserProfile::from_redirect(&user);
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.last_name, "Lovelace");
        assert_eq!(profile.providers, vec!["google.com".to_string()]);
        assert!(profile.gender.is_empty());
    }
}
