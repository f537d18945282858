//! JSON notification payload carried inside a decrypted push.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Notification identifier.
///
/// Servers send it as a JSON string or a bare number; both normalize to the
/// decimal text form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

/// The fields a downstream sink needs from a push notification.
///
/// Every field is optional on the wire; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushNotification {
    /// Token the sink can use to fetch the full notification
    pub access_token: String,
    /// Locale the text fields are written in
    pub preferred_locale: String,
    /// Server-side notification id
    pub notification_id: NotificationId,
    /// Kind of event (`mention`, `follow`, ...)
    pub notification_type: String,
    /// Icon URL
    pub icon: String,
    /// Title line
    pub title: String,
    /// Body text
    pub body: String,
}

impl PushNotification {
    /// Parse a decrypted payload.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `plaintext` is not a JSON object of this shape.
    pub fn from_slice(plaintext: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(plaintext)
    }

    /// Serialize to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if serialization fails.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids() {
        let numeric = PushNotification::from_slice(br#"{"notification_id":12345}"#).unwrap();
        assert_eq!(numeric.notification_id.as_str(), "12345");

        let text = PushNotification::from_slice(br#"{"notification_id":"12345"}"#).unwrap();
        assert_eq!(text.notification_id, numeric.notification_id);
    }

    #[test]
    fn test_full_payload() {
        let json = br#"{
            "access_token": "tok",
            "preferred_locale": "en",
            "notification_id": 7,
            "notification_type": "mention",
            "icon": "https://example.com/a.png",
            "title": "New mention",
            "body": "hello",
            "extra_field": [1, 2, 3]
        }"#;
        let n = PushNotification::from_slice(json).unwrap();
        assert_eq!(n.access_token, "tok");
        assert_eq!(n.notification_type, "mention");
        assert_eq!(n.notification_id.to_string(), "7");
        assert_eq!(n.body, "hello");
    }

    #[test]
    fn test_missing_fields_default() {
        let n = PushNotification::from_slice(b"{}").unwrap();
        assert_eq!(n, PushNotification::default());
    }

    #[test]
    fn test_not_an_object() {
        assert!(PushNotification::from_slice(b"plain text").is_err());
        assert!(PushNotification::from_slice(br#"{"notification_id":true}"#).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let n = PushNotification {
            notification_id: NotificationId::from("99"),
            title: "t".to_string(),
            ..PushNotification::default()
        };
        assert_eq!(PushNotification::from_slice(&n.to_vec().unwrap()).unwrap(), n);
    }
}
