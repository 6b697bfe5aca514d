use std::fmt;

use serde::{Deserialize, Serialize};

/// Login payload sent to the authentication endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Manual Debug so the password never lands in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Profile payload for the authenticated user, as returned by the server.
///
/// Common fields are typed for display; everything else the server sends is
/// carried opaquely in `extra` so it survives a persist/reload cycle even
/// when the server grows new fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Display name assembled from whatever name fields are present,
    /// falling back to the email address.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_keeps_unknown_fields() {
        let json = r#"{"id":"u-42","email":"ada@example.com","firstName":"Ada","lastName":"Lovelace","role":"admin","tenantId":"t-7","flags":{"beta":true}}"#;

        let profile: UserProfile =
            serde_json::from_str(json).expect("Failed to parse profile test JSON");
        assert_eq!(profile.id.as_deref(), Some("u-42"));
        assert_eq!(profile.display_name(), "Ada Lovelace");
        assert_eq!(
            profile.extra.get("tenantId").and_then(|v| v.as_str()),
            Some("t-7")
        );

        // Unknown fields must survive a round-trip through serialization.
        let rendered = serde_json::to_string(&profile).unwrap();
        let reparsed: UserProfile = serde_json::from_str(&rendered).unwrap();
        assert_eq!(reparsed, profile);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut profile = UserProfile {
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "ada@example.com");

        profile.first_name = Some("Ada".to_string());
        assert_eq!(profile.display_name(), "Ada");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("ada@example.com", "hunter2");
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("ada@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
