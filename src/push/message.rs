use serde::{Deserialize, Serialize};

/// A push payload as delivered by the push channel.
///
/// Both fields are base64 text: `subject` is the RSA-encrypted message body,
/// `signature` is the server's signature over the encrypted bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedNotification {
    pub subject: String,
    pub signature: String,
}

/// A push message recovered from a verified, decrypted subject.
///
/// Only ever constructed after signature verification and decryption both
/// succeeded. Field names follow the server's push JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecryptedNotification {
    /// Originating server app, e.g. "spreed" for calls and chat.
    pub app: String,

    /// Message kind, e.g. "call", "chat", "room".
    #[serde(rename = "type", default)]
    pub notification_type: String,

    /// Human-readable subject line. Absent on delete messages.
    #[serde(default)]
    pub subject: String,

    /// Conversation/room token this message refers to, if any.
    #[serde(default)]
    pub id: Option<String>,

    /// Server-side notification id, used to dismiss the notification later.
    #[serde(rename = "nid", default)]
    pub notification_id: Option<i64>,

    /// Instructs the client to remove the notification with `notification_id`.
    #[serde(default)]
    pub delete: bool,

    /// Instructs the client to remove all notifications for this account.
    #[serde(rename = "delete-all", default)]
    pub delete_all: bool,
}

impl DecryptedNotification {
    /// True when this message only clears previously shown notifications.
    pub fn is_delete_message(&self) -> bool {
        self.delete || self.delete_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_call_message() {
        let json = r#"{
            "app": "spreed",
            "type": "call",
            "subject": "Alice invited you to a call",
            "id": "abc123token",
            "nid": 42
        }"#;
        let msg: DecryptedNotification = serde_json::from_str(json).unwrap();
        assert_eq!(msg.app, "spreed");
        assert_eq!(msg.notification_type, "call");
        assert_eq!(msg.subject, "Alice invited you to a call");
        assert_eq!(msg.id.as_deref(), Some("abc123token"));
        assert_eq!(msg.notification_id, Some(42));
        assert!(!msg.is_delete_message());
    }

    #[test]
    fn parses_delete_message_without_subject() {
        let json = r#"{"app": "spreed", "type": "", "nid": 7, "delete": true}"#;
        let msg: DecryptedNotification = serde_json::from_str(json).unwrap();
        assert_eq!(msg.subject, "");
        assert_eq!(msg.notification_id, Some(7));
        assert!(msg.is_delete_message());
    }

    #[test]
    fn missing_app_is_an_error() {
        let result = serde_json::from_str::<DecryptedNotification>(r#"{"type": "call"}"#);
        assert!(result.is_err());
    }
}
