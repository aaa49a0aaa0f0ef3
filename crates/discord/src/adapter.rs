use std::sync::Arc;

use {
    chatbridge_broker::RelayQueue,
    chatbridge_channels::{AdapterState, InboundRelay, StateHandle, WorkerConfig},
    chatbridge_common::Platform,
    chatbridge_config::{DiscordConfig, RelayConfig},
    chatbridge_routing::Router,
    secrecy::ExposeSecret,
    serenity::Client,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{DiscordHandler, Error, Result};

/// Runs the Discord side of the bridge until cancelled.
pub struct DiscordAdapter {
    config: DiscordConfig,
    worker_config: WorkerConfig,
    router: Router,
    queue: Arc<dyn RelayQueue>,
    cancel: CancellationToken,
    state: StateHandle,
}

impl DiscordAdapter {
    pub fn new(
        config: DiscordConfig,
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

    /// Connect to the gateway and relay until the cancellation token fires.
    pub async fn run(self) -> Result<()> {
        if !self.config.has_token() {
            return Err(Error::MissingToken);
        }

        self.state.set(AdapterState::Connecting);
        let worker_cancel = self.cancel.child_token();
        let handler = Arc::new(DiscordHandler::new(
            InboundRelay::new(Platform::Discord, self.router, Arc::clone(&self.queue)),
            self.queue,
            worker_cancel.clone(),
            self.worker_config,
            self.state.clone(),
        ));

        let mut client = Client::builder(
            self.config.token.expose_secret(),
            DiscordHandler::intents(),
        )
        .event_handler_arc(Arc::clone(&handler))
        .await?;
        let shard_manager = Arc::clone(&client.shard_manager);

        info!("discord gateway connecting");
        let result = tokio::select! {
            result = client.start() => result.map_err(Error::from),
            () = self.cancel.cancelled() => {
                info!("discord adapter shutting down");
                shard_manager.shutdown_all().await;
                Ok(())
            },
        };

        // Also reached when the gateway fails on its own; stop the worker
        // and let it finish its current delivery.
        worker_cancel.cancel();
        if let Some(worker) = handler.take_worker()
            && let Err(e) = worker.await
        {
            warn!(error = %e, "discord relay worker panicked");
        }
        self.state.set(AdapterState::Disconnected);
        result
    }
}
