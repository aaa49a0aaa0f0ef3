//! Frames exchanged with the WhatsApp Web automation sidecar.
//!
//! Every call is a `req` frame answered by a `res` frame with the same id.
//! The sidecar may interleave other frames (QR codes, presence); callers skip
//! them.

use serde::{Deserialize, Serialize};

/// Client → sidecar RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFrame {
    pub r#type: String, // always "req"
    pub id: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RequestFrame {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            r#type: "req".into(),
            id: uuid::Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorShape {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// Sidecar → client RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub r#type: String, // always "res"
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

/// Entry of the sidecar's unread chat list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ChatSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            title: None,
        }
    }

    /// The name the chat is addressed by: `name`, else `title`.
    pub fn display_name(&self) -> Option<&str> {
        [self.name.as_deref(), self.title.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// A message read from an open chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "fromMe")]
    pub from_me: bool,
}

impl ChatMessage {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_shape() {
        let frame = RequestFrame::new("chats.unread", None);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "req");
        assert_eq!(json["method"], "chats.unread");
        assert!(json.get("params").is_none());
        assert!(uuid::Uuid::parse_str(&frame.id).is_ok());
    }

    #[test]
    fn response_frame_without_payload() {
        let frame: ResponseFrame = serde_json::from_str(
            r#"{"type": "res", "id": "1", "ok": false, "error": {"message": "no such chat"}}"#,
        )
        .unwrap();
        assert!(!frame.ok);
        assert_eq!(frame.error.unwrap().message, "no such chat");
    }

    #[test]
    fn chat_name_falls_back_to_title() {
        let chat: ChatSummary = serde_json::from_str(r#"{"name": " ", "title": "Work"}"#).unwrap();
        assert_eq!(chat.display_name(), Some("Work"));
        assert_eq!(ChatSummary::default().display_name(), None);
    }

    #[test]
    fn message_fields_are_optional() {
        let msg: ChatMessage = serde_json::from_str(r#"{"text": "hola", "fromMe": true}"#).unwrap();
        assert_eq!(msg.text(), "hola");
        assert!(msg.from_me);
        assert_eq!(msg.sender, None);
    }
}
