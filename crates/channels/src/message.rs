//! The payload carried on the relay queues.
//!
//! Wire format (JSON): `{"autor", "texto", "destino_wa" | "destino_ds", "origen"?}`.
//! `destino_wa` is a WhatsApp chat name, `destino_ds` a Discord channel id
//! (number or numeric string). Producers on older deployments omit `origen`.

use {
    chatbridge_common::Platform,
    chatbridge_routing::Identity,
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result};

/// One chat message on its way to the other platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub author: String,
    pub text: String,
    pub destination: Identity,
    pub origin: Platform,
}

#[derive(Serialize, Deserialize)]
struct WirePayload {
    autor: String,
    texto: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    destino_wa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    destino_ds: Option<ChannelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origen: Option<Platform>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChannelRef {
    Number(u64),
    Text(String),
}

impl RelayMessage {
    pub fn new(
        author: impl Into<String>,
        text: impl Into<String>,
        destination: Identity,
        origin: Platform,
    ) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            destination,
            origin,
        }
    }

    /// Platform that owns the destination identity.
    pub fn destination_platform(&self) -> Platform {
        match self.destination {
            Identity::Numeric(_) => Platform::Discord,
            Identity::Named(_) => Platform::Whatsapp,
        }
    }

    /// Serialize to the queue wire format.
    pub fn encode(&self) -> Result<String> {
        let (destino_wa, destino_ds) = match &self.destination {
            Identity::Named(chat) => (Some(chat.clone()), None),
            Identity::Numeric(id) => (None, Some(ChannelRef::Number(*id))),
        };
        let wire = WirePayload {
            autor: self.author.clone(),
            texto: self.text.clone(),
            destino_wa,
            destino_ds,
            origen: Some(self.origin),
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// Decode a queued payload for the adapter of `consumer`.
    ///
    /// Only the destination field belonging to `consumer` is read; a payload
    /// without it is malformed for this consumer.
    pub fn decode_for(raw: &str, consumer: Platform) -> Result<Self> {
        let wire: WirePayload = serde_json::from_str(raw).map_err(Error::malformed)?;

        let destination = match consumer {
            Platform::Discord => match wire.destino_ds {
                Some(ChannelRef::Number(id)) => Identity::Numeric(id),
                Some(ChannelRef::Text(text)) => match text.trim().parse::<u64>() {
                    Ok(id) => Identity::Numeric(id),
                    Err(_) => {
                        return Err(Error::malformed(format!(
                            "destino_ds {text:?} is not a channel id"
                        )));
                    },
                },
                None => return Err(Error::malformed("missing destino_ds")),
            },
            Platform::Whatsapp => match wire.destino_wa {
                Some(chat) if !chat.trim().is_empty() => Identity::Named(chat),
                _ => return Err(Error::malformed("missing destino_wa")),
            },
        };

        if wire.texto.is_empty() {
            return Err(Error::malformed("empty texto"));
        }

        Ok(Self {
            author: wire.autor,
            text: wire.texto,
            destination,
            origin: wire.origen.unwrap_or_else(|| consumer.opposite()),
        })
    }

    /// Text as posted on the destination platform: `**[WA - Bob]:** hi`.
    pub fn render(&self) -> String {
        format!("**[{} - {}]:** {}", self.origin.tag(), self.author, self.text)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn encodes_whatsapp_destination() {
        let msg = RelayMessage::new("Bob", "hi", "family-group".into(), Platform::Discord);
        let json: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "autor": "Bob",
                "texto": "hi",
                "destino_wa": "family-group",
                "origen": "discord",
            })
        );
    }

    #[test]
    fn encodes_discord_destination_as_number() {
        let msg = RelayMessage::new("Ana", "hola", Identity::Numeric(1001), Platform::Whatsapp);
        let json: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(json["destino_ds"], 1001);
        assert_eq!(json["origen"], "whatsapp");
        assert!(json.get("destino_wa").is_none());
    }

    #[test]
    fn decodes_legacy_payload_without_origin() {
        let raw = r#"{"autor": "Bob", "texto": "hi", "destino_wa": "family-group"}"#;
        let msg = RelayMessage::decode_for(raw, Platform::Whatsapp).unwrap();
        assert_eq!(msg.destination, Identity::Named("family-group".into()));
        assert_eq!(msg.origin, Platform::Discord);
        assert_eq!(msg.render(), "**[DS - Bob]:** hi");
    }

    #[rstest]
    #[case(r#"{"autor": "A", "texto": "t", "destino_ds": 1001}"#)]
    #[case(r#"{"autor": "A", "texto": "t", "destino_ds": "1001"}"#)]
    fn decodes_channel_as_number_or_string(#[case] raw: &str) {
        let msg = RelayMessage::decode_for(raw, Platform::Discord).unwrap();
        assert_eq!(msg.destination, Identity::Numeric(1001));
        assert_eq!(msg.render(), "**[WA - A]:** t");
    }

    #[rstest]
    #[case::not_json("{{{", Platform::Discord)]
    #[case::wrong_consumer(r#"{"autor": "A", "texto": "t", "destino_wa": "x"}"#, Platform::Discord)]
    #[case::bad_channel(r#"{"autor": "A", "texto": "t", "destino_ds": "general"}"#, Platform::Discord)]
    #[case::empty_chat(r#"{"autor": "A", "texto": "t", "destino_wa": ""}"#, Platform::Whatsapp)]
    #[case::empty_text(r#"{"autor": "A", "texto": "", "destino_wa": "x"}"#, Platform::Whatsapp)]
    #[case::missing_author(r#"{"texto": "t", "destino_wa": "x"}"#, Platform::Whatsapp)]
    fn rejects_malformed(#[case] raw: &str, #[case] consumer: Platform) {
        let err = RelayMessage::decode_for(raw, consumer).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }), "{err}");
        assert!(!err.wants_backoff());
    }

    #[test]
    fn destination_platform_follows_identity() {
        let to_wa = RelayMessage::new("a", "b", "chat".into(), Platform::Discord);
        let to_ds = RelayMessage::new("a", "b", Identity::Numeric(1), Platform::Whatsapp);
        assert_eq!(to_wa.destination_platform(), Platform::Whatsapp);
        assert_eq!(to_ds.destination_platform(), Platform::Discord);
    }
}
