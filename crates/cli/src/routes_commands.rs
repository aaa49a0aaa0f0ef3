use std::{io::Write, path::PathBuf, sync::Arc};

use {
    anyhow::bail,
    chatbridge_broker::MappingSnapshot,
    chatbridge_config::BridgeConfig,
    chatbridge_routing::{Identity, InitOutcome, Router},
    clap::Subcommand,
};

use crate::bridge::connect_broker;

#[derive(Subcommand)]
pub enum RoutesAction {
    /// Replace the route tables with the mapping file.
    Sync {
        /// Mapping file (defaults to the configured `mapping.path`).
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print every route.
    List,
    /// Add a route without touching the mapping file.
    Add {
        /// Discord channel id.
        channel_id: u64,
        /// WhatsApp chat name.
        chat: String,
    },
    /// Show where a channel id or chat name is relayed to.
    Resolve {
        /// Discord channel id or WhatsApp chat name.
        identity: String,
    },
}

pub async fn handle_routes(action: RoutesAction, config: &BridgeConfig) -> anyhow::Result<()> {
    let broker = Arc::new(connect_broker(&config.broker).await?);
    let router = Router::new(broker.clone());

    let result = run_action(action, config, &router, &mut std::io::stdout().lock()).await;
    broker.close().await;
    result
}

async fn run_action(
    action: RoutesAction,
    config: &BridgeConfig,
    router: &Router,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match action {
        RoutesAction::Sync { file } => {
            let path = file.unwrap_or_else(|| config.mapping.path.clone());
            match router.initialize(&path).await? {
                InitOutcome::Loaded { routes } => {
                    writeln!(out, "Synced {routes} route(s) from {}", path.display())?;
                },
                InitOutcome::Missing => bail!("no mapping file at {}", path.display()),
            }
        },
        RoutesAction::List => print_routes(out, &router.routes().await?)?,
        RoutesAction::Add { channel_id, chat } => {
            router.add_route(channel_id, &chat).await?;
            writeln!(out, "Added route {channel_id} <-> {chat}")?;
        },
        RoutesAction::Resolve { identity } => {
            let origin = Identity::parse(&identity);
            match router.resolve(&origin).await? {
                Some(destination) => writeln!(out, "{destination}")?,
                None => writeln!(out, "no route for {origin}")?,
            }
        },
    }
    Ok(())
}

fn print_routes(out: &mut impl Write, snapshot: &MappingSnapshot) -> anyhow::Result<()> {
    if snapshot.is_empty() {
        writeln!(out, "No routes.")?;
        return Ok(());
    }
    for (channel, chat) in &snapshot.discord_to_whatsapp {
        writeln!(out, "  {channel:<20} -> {chat}")?;
    }
    // Entries without a partner in the other table.
    let orphans: Vec<_> = snapshot
        .whatsapp_to_discord
        .iter()
        .filter(|(chat, channel)| {
            !snapshot
                .discord_to_whatsapp
                .iter()
                .any(|(c, n)| c == channel && n == chat)
        })
        .collect();
    if !orphans.is_empty() {
        writeln!(out, "Reverse-only entries:")?;
        for (chat, channel) in orphans {
            writeln!(out, "  {chat:<20} -> {channel}")?;
        }
    }
    Ok(())
}
