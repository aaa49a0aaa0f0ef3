use std::marker::PhantomData;

use {
    async_trait::async_trait,
    chatbridge_channels::{Error, PlatformOutbound, RelayMessage, Result},
    chatbridge_common::Platform,
};

use crate::WhatsAppSession;

/// Posts relayed messages into WhatsApp chats through a [`WhatsAppSession`].
pub struct WhatsAppOutbound<S> {
    _session: PhantomData<fn() -> S>,
}

impl<S> Default for WhatsAppOutbound<S> {
    fn default() -> Self {
        Self {
            _session: PhantomData,
        }
    }
}

#[async_trait]
impl<S: WhatsAppSession> PlatformOutbound for WhatsAppOutbound<S> {
    type Session = S;

    fn platform(&self) -> Platform {
        Platform::Whatsapp
    }

    async fn deliver(&self, session: &mut S, message: &RelayMessage) -> Result<()> {
        let Some(chat) = message.destination.as_named() else {
            return Err(Error::malformed(format!(
                "{} is not a whatsapp chat name",
                message.destination
            )));
        };
        session
            .send_message(chat, &message.render())
            .await
            .map_err(|e| Error::send_failed(chat, e))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::MockSession,
        chatbridge_routing::Identity,
    };

    #[tokio::test]
    async fn sends_rendered_text_to_named_chat() {
        let mut session = MockSession::default();
        let msg = RelayMessage::new("Bob", "hi", "family-group".into(), Platform::Discord);
        WhatsAppOutbound::<MockSession>::default()
            .deliver(&mut session, &msg)
            .await
            .unwrap();
        assert_eq!(session.sent, vec![(
            "family-group".to_string(),
            "**[DS - Bob]:** hi".to_string()
        )]);
    }

    #[tokio::test]
    async fn session_failure_is_a_send_failure() {
        let mut session = MockSession::default();
        session.fail_send = true;
        let msg = RelayMessage::new("Bob", "hi", "family-group".into(), Platform::Discord);
        let err = WhatsAppOutbound::<MockSession>::default()
            .deliver(&mut session, &msg)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SendFailed { ref destination, .. } if destination == "family-group"));
    }

    #[tokio::test]
    async fn numeric_destination_is_rejected() {
        let mut session = MockSession::default();
        let msg = RelayMessage::new("Ana", "hola", Identity::Numeric(1001), Platform::Whatsapp);
        let err = WhatsAppOutbound::<MockSession>::default()
            .deliver(&mut session, &msg)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
        assert!(session.sent.is_empty());
    }
}
