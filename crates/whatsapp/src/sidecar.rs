//! [`WhatsAppSession`] backed by a WebSocket to the browser automation
//! sidecar.

use std::time::Duration;

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt},
    serde::de::DeserializeOwned,
    serde_json::{Value, json},
    tokio::net::TcpStream,
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, trace, warn},
};

use crate::{
    Error, Result, WhatsAppSession,
    error::Context,
    types::{ChatMessage, ChatSummary, RequestFrame, ResponseFrame},
};

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct SidecarSession {
    url: String,
    request_timeout: Duration,
    /// `None` after a transport failure; the next call reconnects.
    socket: Option<Socket>,
}

impl SidecarSession {
    /// Connect once; the handshake is bounded by `request_timeout`.
    pub async fn connect(url: &str, request_timeout: Duration) -> Result<Self> {
        let socket = open_socket(url, request_timeout).await?;
        info!(url, "connected to whatsapp sidecar");
        Ok(Self {
            url: url.to_string(),
            request_timeout,
            socket: Some(socket),
        })
    }

    /// Keep trying to connect with exponential backoff. `None` if `cancel`
    /// fires first.
    pub async fn connect_with_retry(
        url: &str,
        request_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<Self> {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let attempt = tokio::select! {
                () = cancel.cancelled() => return None,
                attempt = Self::connect(url, request_timeout) => attempt,
            };
            match attempt {
                Ok(session) => return Some(session),
                Err(e) => {
                    warn!(
                        url,
                        error = %e,
                        delay_ms = backoff.as_millis() as u64,
                        "whatsapp sidecar not reachable, retrying"
                    );
                },
            }
            tokio::select! {
                () = cancel.cancelled() => return None,
                () = tokio::time::sleep(backoff) => {},
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Send one request and wait for its response payload.
    pub async fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.socket.is_none() {
            let socket = open_socket(&self.url, self.request_timeout).await?;
            info!(url = %self.url, "reconnected to whatsapp sidecar");
            self.socket = Some(socket);
        }

        let result = match tokio::time::timeout(self.request_timeout, self.exchange(method, params))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                method: method.to_string(),
            }),
        };
        if matches!(
            result,
            Err(Error::WebSocket(_) | Error::Connection(_) | Error::Timeout { .. })
        ) {
            self.socket = None;
        }
        result
    }

    async fn exchange(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(Error::connection("not connected"));
        };

        let frame = RequestFrame::new(method, params);
        socket
            .send(Message::Text(serde_json::to_string(&frame)?.into()))
            .await?;
        debug!(method, id = %frame.id, "sidecar request sent");

        while let Some(msg) = socket.next().await {
            match msg? {
                Message::Text(text) => {
                    let Ok(response) = serde_json::from_str::<ResponseFrame>(&text) else {
                        trace!("skipping non-response sidecar frame");
                        continue;
                    };
                    // Not our response, skip it
                    if response.r#type != "res" || response.id != frame.id {
                        continue;
                    }
                    if response.ok {
                        return Ok(response.payload.unwrap_or(Value::Null));
                    }
                    return Err(Error::Sidecar {
                        method: method.to_string(),
                        message: response
                            .error
                            .map(|e| e.message)
                            .unwrap_or_else(|| "unknown error".into()),
                    });
                },
                Message::Ping(data) => socket.send(Message::Pong(data)).await?,
                Message::Close(_) => {
                    return Err(Error::connection("sidecar closed the connection"));
                },
                _ => {},
            }
        }
        Err(Error::connection("sidecar connection ended"))
    }
}

async fn open_socket(url: &str, timeout: Duration) -> Result<Socket> {
    match tokio::time::timeout(timeout, connect_async(url)).await {
        Ok(connected) => Ok(connected?.0),
        Err(_) => Err(Error::connection(format!(
            "handshake with {url} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

fn from_payload<T: DeserializeOwned + Default>(method: &str, payload: Value) -> Result<T> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload).with_context(|| format!("unexpected {method} payload"))
}

#[async_trait]
impl WhatsAppSession for SidecarSession {
    async fn unread_chats(&mut self) -> Result<Vec<ChatSummary>> {
        from_payload("chats.unread", self.call("chats.unread", None).await?)
    }

    async fn open_chat(&mut self, name: &str) -> Result<bool> {
        let payload = self.call("chat.open", Some(json!({ "name": name }))).await?;
        Ok(match payload {
            Value::Bool(opened) => opened,
            Value::Object(map) => map.get("opened").and_then(Value::as_bool).unwrap_or(true),
            _ => true,
        })
    }

    async fn collect_messages(&mut self) -> Result<Vec<ChatMessage>> {
        from_payload("chat.messages", self.call("chat.messages", None).await?)
    }

    async fn send_message(&mut self, chat: &str, text: &str) -> Result<()> {
        self.call("chat.send", Some(json!({ "chat": chat, "text": text })))
            .await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tokio::net::TcpListener};

    /// Minimal sidecar: answers every request after an unrelated event frame,
    /// except `chat.messages`, which it never answers.
    async fn fake_sidecar() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    while let Some(Ok(Message::Text(text))) = ws.next().await {
                        let req: RequestFrame = serde_json::from_str(&text).unwrap();
                        let params = req.params.unwrap_or_default();
                        let reply = match req.method.as_str() {
                            "chats.unread" => Some(json!({
                                "type": "res", "id": req.id, "ok": true,
                                "payload": [{"name": "family-group"}, {"title": "Work"}],
                            })),
                            "chat.open" => Some(json!({
                                "type": "res", "id": req.id, "ok": true,
                                "payload": {"opened": params["name"] == "family-group"},
                            })),
                            "chat.send" if params["chat"] == "blocked" => Some(json!({
                                "type": "res", "id": req.id, "ok": false,
                                "error": {"message": "chat not found"},
                            })),
                            "chat.send" => Some(json!({"type": "res", "id": req.id, "ok": true})),
                            _ => None,
                        };
                        let noise = json!({"type": "event", "event": "presence"}).to_string();
                        ws.send(Message::Text(noise.into())).await.unwrap();
                        if let Some(reply) = reply {
                            ws.send(Message::Text(reply.to_string().into())).await.unwrap();
                        }
                    }
                });
            }
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn calls_skip_unrelated_frames() {
        let url = fake_sidecar().await;
        let mut session = SidecarSession::connect(&url, Duration::from_secs(2))
            .await
            .unwrap();

        let chats = session.unread_chats().await.unwrap();
        assert_eq!(chats, vec![ChatSummary::named("family-group"), ChatSummary {
            name: None,
            title: Some("Work".into()),
        }]);
        assert!(session.open_chat("family-group").await.unwrap());
        assert!(!session.open_chat("ghost").await.unwrap());
        session
            .send_message("family-group", "**[DS - Bob]:** hi")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_request_surfaces_sidecar_error() {
        let url = fake_sidecar().await;
        let mut session = SidecarSession::connect(&url, Duration::from_secs(2))
            .await
            .unwrap();
        let err = session.send_message("blocked", "hi").await.unwrap_err();
        assert!(matches!(err, Error::Sidecar { ref message, .. } if message == "chat not found"));
        // Still connected after an application-level error.
        assert!(session.socket.is_some());
    }

    #[tokio::test]
    async fn timeout_drops_socket_and_next_call_reconnects() {
        let url = fake_sidecar().await;
        let mut session = SidecarSession::connect(&url, Duration::from_millis(100))
            .await
            .unwrap();

        let err = session.collect_messages().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(session.socket.is_none());

        assert_eq!(session.unread_chats().await.unwrap().len(), 2);
    }

    #[test]
    fn unexpected_payload_names_the_method() {
        let err = from_payload::<Vec<ChatSummary>>("chats.unread", json!({"chats": 3})).unwrap_err();
        assert!(err.to_string().starts_with("unexpected chats.unread payload"), "{err}");
        assert!(from_payload::<Vec<ChatSummary>>("chats.unread", Value::Null).unwrap().is_empty());
    }

    /// Accepts TCP connections and never answers the websocket handshake.
    async fn silent_listener() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        (format!("ws://{addr}"), task)
    }

    #[tokio::test]
    async fn stalled_handshake_on_reconnect_times_out() {
        let (url, _server) = silent_listener().await;
        let mut session = SidecarSession {
            url,
            request_timeout: Duration::from_millis(200),
            socket: None,
        };

        let result = tokio::time::timeout(Duration::from_secs(3), session.unread_chats())
            .await
            .expect("reconnect must not hang");
        assert!(matches!(result, Err(Error::Connection(_))));
        assert!(session.socket.is_none());
    }

    #[tokio::test]
    async fn retry_observes_cancel_during_stalled_handshake() {
        let (url, _server) = silent_listener().await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let session = tokio::time::timeout(
            Duration::from_secs(3),
            SidecarSession::connect_with_retry(&url, Duration::from_secs(30), &cancel),
        )
        .await
        .expect("cancel must interrupt the handshake");
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn retry_gives_up_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Port 1 is never a websocket server.
        let session =
            SidecarSession::connect_with_retry("ws://127.0.0.1:1", Duration::from_secs(1), &cancel)
                .await;
        assert!(session.is_none());
    }
}
