use std::io::Write;

use {
    chatbridge_broker::{Queue, RelayQueue},
    chatbridge_config::BridgeConfig,
    clap::Subcommand,
};

use crate::bridge::connect_broker;

#[derive(Subcommand)]
pub enum QueueAction {
    /// Show how many payloads wait in each relay queue.
    Stats,
}

pub async fn handle_queue(action: QueueAction, config: &BridgeConfig) -> anyhow::Result<()> {
    let broker = connect_broker(&config.broker).await?;

    let result = match action {
        QueueAction::Stats => queue_stats(&broker).await,
    };
    broker.close().await;

    let stats = result?;
    print_stats(&mut std::io::stdout().lock(), &stats)
}

async fn queue_stats(queue: &impl RelayQueue) -> anyhow::Result<Vec<(Queue, u64)>> {
    let mut stats = Vec::with_capacity(2);
    for q in [Queue::DiscordToWhatsapp, Queue::WhatsappToDiscord] {
        stats.push((q, queue.len(q).await?));
    }
    Ok(stats)
}

fn print_stats(out: &mut impl Write, stats: &[(Queue, u64)]) -> anyhow::Result<()> {
    for (queue, pending) in stats {
        writeln!(out, "  {:<16} {pending}", queue.key())?;
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chatbridge_broker::SqliteBroker};

    #[tokio::test]
    async fn counts_pending_payloads_per_direction() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("bridge.db").display());
        let broker = SqliteBroker::connect(&url, 1).await.unwrap();
        broker.push(Queue::DiscordToWhatsapp, "{}").await.unwrap();
        broker.push(Queue::DiscordToWhatsapp, "{}").await.unwrap();

        let stats = queue_stats(&broker).await.unwrap();
        assert_eq!(stats, vec![
            (Queue::DiscordToWhatsapp, 2),
            (Queue::WhatsappToDiscord, 0),
        ]);

        let mut buf = Vec::new();
        print_stats(&mut buf, &stats).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("queue_ds_to_wa"));
        assert!(text.lines().next().unwrap().ends_with(" 2"));
    }
}
