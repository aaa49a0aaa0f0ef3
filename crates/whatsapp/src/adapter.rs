use std::sync::Arc;

use {
    chatbridge_broker::RelayQueue,
    chatbridge_channels::{
        AdapterState, DedupCache, InboundRelay, RelayWorker, SessionLock, StateHandle,
        WorkerConfig,
    },
    chatbridge_common::Platform,
    chatbridge_config::{RelayConfig, WhatsAppConfig},
    chatbridge_routing::Router,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{ChatScanner, SidecarSession, WhatsAppOutbound, WhatsAppSession};

/// Runs the WhatsApp side of the bridge until cancelled.
pub struct WhatsAppAdapter {
    config: WhatsAppConfig,
    worker_config: WorkerConfig,
    router: Router,
    queue: Arc<dyn RelayQueue>,
    cancel: CancellationToken,
    state: StateHandle,
}

impl WhatsAppAdapter {
    pub fn new(
        config: WhatsAppConfig,
        relay: &RelayConfig,
        router: Router,
        queue: Arc<dyn RelayQueue>,
        cancel: CancellationToken,
    ) -> Self {
        let worker_config = WorkerConfig {
            poll_timeout: relay.poll_timeout(),
            error_backoff: config.error_backoff(),
        };
        Self {
            config,
            worker_config,
            router,
            queue,
            cancel,
            state: StateHandle::new(),
        }
    }

    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Connect to the sidecar and relay until the cancellation token fires.
    pub async fn run(self) {
        self.state.set(AdapterState::Connecting);
        let Some(session) = SidecarSession::connect_with_retry(
            &self.config.sidecar_url,
            self.config.request_timeout(),
            &self.cancel,
        )
        .await
        else {
            self.state.set(AdapterState::Disconnected);
            return;
        };
        self.run_with_session(session).await;
    }

    /// Relay through an already established session.
    pub async fn run_with_session<S: WhatsAppSession>(self, session: S) {
        self.state.set(AdapterState::Ready);
        let session = SessionLock::new(session);

        let worker = RelayWorker::new(
            Arc::clone(&self.queue),
            Arc::new(WhatsAppOutbound::<S>::default()),
            session.clone(),
            self.cancel.clone(),
            self.worker_config,
        )
        .spawn();

        let relay = InboundRelay::new(Platform::Whatsapp, self.router, self.queue).with_dedup(
            DedupCache::new(self.config.dedup_per_chat, self.config.dedup_max_chats),
        );
        let scanner = ChatScanner::new(
            session,
            relay,
            self.config.scan_interval(),
            self.config.error_backoff(),
        );

        self.state.set(AdapterState::Running);
        scanner.run(self.cancel.clone()).await;

        if let Err(e) = worker.await {
            warn!(error = %e, "whatsapp relay worker panicked");
        }
        self.state.set(AdapterState::Disconnected);
        info!("whatsapp adapter stopped");
    }
}
