use std::{sync::Arc, time::Duration};

use {
    chatbridge_broker::RelayQueue,
    chatbridge_routing::Identity,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{Error, PlatformOutbound, PlatformQueues, RelayMessage, Result, SessionLock};

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Longest a single pop waits before the loop checks for shutdown.
    pub poll_timeout: Duration,
    /// Sleep after a broker or delivery failure.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            error_backoff: Duration::from_secs(2),
        }
    }
}

/// Result of one [`RelayWorker::poll_once`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The queue stayed empty for the whole poll timeout.
    Idle,
    Delivered { destination: Identity },
    /// The payload could not be decoded and was discarded.
    Dropped,
}

/// Drains one relay queue into a platform.
///
/// A popped payload is gone from the broker: if delivery fails it is logged
/// and not put back.
pub struct RelayWorker<O: PlatformOutbound> {
    queue: Arc<dyn RelayQueue>,
    outbound: Arc<O>,
    session: SessionLock<O::Session>,
    cancel: CancellationToken,
    config: WorkerConfig,
}

impl<O: PlatformOutbound> RelayWorker<O> {
    pub fn new(
        queue: Arc<dyn RelayQueue>,
        outbound: Arc<O>,
        session: SessionLock<O::Session>,
        cancel: CancellationToken,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            outbound,
            session,
            cancel,
            config,
        }
    }

    /// Pop at most one payload and deliver it.
    ///
    /// The session lock is taken after the pop returns and released as soon
    /// as the platform call finishes.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let platform = self.outbound.platform();
        let queue = platform.inbound_queue();

        let Some(raw) = self.queue.pop(queue, self.config.poll_timeout).await? else {
            return Ok(PollOutcome::Idle);
        };

        let message = match RelayMessage::decode_for(&raw, platform) {
            Ok(message) => message,
            Err(e) => {
                warn!(%platform, %queue, error = %e, "dropping malformed relay payload");
                return Ok(PollOutcome::Dropped);
            },
        };

        {
            let mut session = self.session.lock().await;
            self.outbound.deliver(&mut session, &message).await?;
        }

        debug!(
            %platform,
            destination = %message.destination,
            origin = %message.origin,
            "relay message delivered"
        );
        Ok(PollOutcome::Delivered {
            destination: message.destination,
        })
    }

    /// Run until cancelled. Cancellation is observed between polls, so a
    /// payload already popped is always delivered first.
    pub async fn run(self) {
        let platform = self.outbound.platform();
        info!(%platform, queue = %platform.inbound_queue(), "relay worker started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.poll_once().await {
                Ok(_) => {},
                Err(e) => {
                    error!(%platform, error = %e, "relay worker iteration failed");
                    if e.wants_backoff() && self.backoff().await.is_err() {
                        break;
                    }
                },
            }
        }

        info!(%platform, "relay worker stopped");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn backoff(&self) -> Result<()> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(Error::unavailable("shutting down")),
            () = tokio::time::sleep(self.config.error_backoff) => Ok(()),
        }
    }
}
