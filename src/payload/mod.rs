//! Canonical APNs payload model.
//!
//! Mirrors the payload key reference of the Apple JSON API. Every field is
//! optional and absent fields are omitted from the wire form entirely — APNs
//! imposes a payload size ceiling and forwards unknown keys, so padding the
//! body with empty values is pure waste.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The canonical notification payload (the `aps` dictionary).
///
/// May be embedded in caller-defined structs that add custom top-level
/// fields; those fields are delivered alongside the `aps` dictionary. See
/// [`NotificationPayload`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub aps: Aps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,

    /// Unread badge count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,

    /// Sound asset name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,

    /// Value `1` marks a silent background update.
    #[serde(
        rename = "content-available",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_available: Option<u8>,

    /// Action category identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(
        rename = "action-loc-key",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub action_loc_key: Option<String>,

    #[serde(rename = "loc-key", default, skip_serializing_if = "Option::is_none")]
    pub loc_key: Option<String>,

    #[serde(rename = "loc-args", default, skip_serializing_if = "Option::is_none")]
    pub loc_args: Option<Vec<String>>,
}

impl Notification {
    /// Whether this payload is a silent background update.
    pub fn is_background(&self) -> bool {
        self.aps.content_available == Some(1)
    }
}

/// Capability contract for anything that can yield the canonical payload.
///
/// Wrapper structs embed a [`Notification`] and add their own fields; the
/// full wrapper is what gets serialized, while `notification()` gives the
/// relay access to the canonical sub-structure for push classification.
pub trait NotificationPayload: Serialize {
    fn notification(&self) -> &Notification;
}

impl NotificationPayload for Notification {
    fn notification(&self) -> &Notification {
        self
    }
}

impl<T: NotificationPayload> NotificationPayload for &T {
    fn notification(&self) -> &Notification {
        (*self).notification()
    }
}

/// Serialize a payload into the wire representation expected by APNs.
pub fn encode<P: NotificationPayload>(payload: &P) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_fields_omitted() {
        let notification = Notification::default();
        let encoded = encode(&notification).unwrap();
        assert_eq!(String::from_utf8(encoded).unwrap(), r#"{"aps":{}}"#);
    }

    #[test]
    fn test_full_alert_payload() {
        let notification = Notification {
            aps: Aps {
                alert: Some(Alert {
                    title: Some("T".to_string()),
                    body: Some("B".to_string()),
                    ..Default::default()
                }),
                badge: Some(1),
                sound: Some("default".to_string()),
                category: Some("CAT".to_string()),
                ..Default::default()
            },
        };

        let value: serde_json::Value =
            serde_json::from_slice(&encode(&notification).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "aps": {
                    "alert": {"title": "T", "body": "B"},
                    "badge": 1,
                    "sound": "default",
                    "category": "CAT"
                }
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let notification = Notification {
            aps: Aps {
                alert: Some(Alert {
                    loc_key: Some("GAME_INVITE".to_string()),
                    loc_args: Some(vec!["alice".to_string(), "bob".to_string()]),
                    ..Default::default()
                }),
                content_available: Some(1),
                ..Default::default()
            },
        };

        let encoded = encode(&notification).unwrap();
        let decoded: Notification = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, notification);
    }

    #[test]
    fn test_background_classification() {
        let mut notification = Notification::default();
        assert!(!notification.is_background());

        notification.aps.content_available = Some(1);
        assert!(notification.is_background());

        // Only the exact value 1 marks a background push.
        notification.aps.content_available = Some(0);
        assert!(!notification.is_background());
    }

    #[test]
    fn test_renamed_keys_on_wire() {
        let json = r#"{
            "aps": {
                "alert": {"action-loc-key": "VIEW", "loc-key": "MSG", "loc-args": ["x"]},
                "content-available": 1
            }
        }"#;

        let decoded: Notification = serde_json::from_str(json).unwrap();
        let alert = decoded.aps.alert.as_ref().unwrap();
        assert_eq!(alert.action_loc_key.as_deref(), Some("VIEW"));
        assert_eq!(alert.loc_key.as_deref(), Some("MSG"));
        assert_eq!(decoded.aps.content_available, Some(1));
    }

    #[derive(Serialize)]
    struct WrappedPayload {
        #[serde(flatten)]
        notification: Notification,
        conversation_id: String,
    }

    impl NotificationPayload for WrappedPayload {
        fn notification(&self) -> &Notification {
            &self.notification
        }
    }

    #[test]
    fn test_embedded_payload_carries_custom_fields() {
        let wrapped = WrappedPayload {
            notification: Notification {
                aps: Aps {
                    badge: Some(3),
                    ..Default::default()
                },
            },
            conversation_id: "conv-42".to_string(),
        };

        let value: serde_json::Value =
            serde_json::from_slice(&encode(&wrapped).unwrap()).unwrap();
        assert_eq!(value["aps"]["badge"], 3);
        assert_eq!(value["conversation_id"], "conv-42");
        assert_eq!(wrapped.notification().aps.badge, Some(3));
    }
}
