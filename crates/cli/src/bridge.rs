use std::{sync::Arc, time::Duration};

use {
    anyhow::bail,
    chatbridge_broker::SqliteBroker,
    chatbridge_channels::StateHandle,
    chatbridge_config::{BridgeConfig, BrokerConfig},
    chatbridge_discord::DiscordAdapter,
    chatbridge_routing::{InitOutcome, Router},
    chatbridge_whatsapp::WhatsAppAdapter,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// How long adapters get to finish in-flight deliveries after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Open the broker, retrying a fixed number of times.
pub async fn connect_broker(config: &BrokerConfig) -> anyhow::Result<SqliteBroker> {
    let attempts = config.connect_attempts.max(1);
    for attempt in 1..=attempts {
        match SqliteBroker::connect(&config.database_url, config.max_connections).await {
            Ok(broker) => {
                info!(url = %config.database_url, "broker connected");
                return Ok(broker);
            },
            Err(e) => {
                warn!(attempt, attempts, error = %e, "broker not reachable");
                if attempt < attempts {
                    tokio::time::sleep(config.connect_delay()).await;
                }
            },
        }
    }
    bail!(
        "could not reach the broker at {} after {attempts} attempts",
        config.database_url
    )
}

/// Log every state change of an adapter. Ends once the adapter is dropped.
fn log_transitions(adapter: &'static str, state: &StateHandle) -> JoinHandle<()> {
    let mut rx = state.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let current = *rx.borrow_and_update();
            info!(adapter, state = %current, "adapter state changed");
        }
    })
}

/// Run both adapters until Ctrl-C.
pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    if !config.discord.has_token() {
        bail!("DISCORD_TOKEN is not configured");
    }

    let broker = Arc::new(connect_broker(&config.broker).await?);
    let router = Router::new(broker.clone());

    match router.initialize(&config.mapping.path).await {
        Ok(InitOutcome::Loaded { routes }) => info!(routes, "router initialized"),
        Ok(InitOutcome::Missing) => {},
        Err(e) => error!(
            path = %config.mapping.path.display(),
            error = %e,
            "router initialization failed, continuing with stored routes"
        ),
    }

    let cancel = CancellationToken::new();

    let discord = DiscordAdapter::new(
        config.discord,
        &config.relay,
        router.clone(),
        broker.clone(),
        cancel.clone(),
    );
    log_transitions("discord", &discord.state());
    let discord_task = tokio::spawn(async move {
        if let Err(e) = discord.run().await {
            error!(error = %e, "discord adapter stopped");
        }
    });

    let whatsapp = WhatsAppAdapter::new(
        config.whatsapp,
        &config.relay,
        router,
        broker.clone(),
        cancel.clone(),
    );
    log_transitions("whatsapp", &whatsapp.state());
    let whatsapp_task = tokio::spawn(whatsapp.run());

    info!("bridge running, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
    }
    info!("shutting down");
    cancel.cancel();

    let joined = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let (discord, whatsapp) = tokio::join!(discord_task, whatsapp_task);
        for (name, result) in [("discord", discord), ("whatsapp", whatsapp)] {
            if let Err(e) = result {
                error!(adapter = name, error = %e, "adapter task panicked");
            }
        }
    })
    .await;
    if joined.is_err() {
        warn!("adapters did not stop in time");
    }

    broker.close().await;
    info!("chatbridge stopped");
    Ok(())
}
