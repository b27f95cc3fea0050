//! Message trigger: one sweep per delivered batch
//!
//! A batch is acknowledged as soon as the sweep has its credentials and
//! project, before any resource is listed, so a long sweep never outlives
//! the ack deadline. A sweep that cannot start leaves the batch
//! unacknowledged so the subscription redelivers it.

use crate::config::SweeperConfig;
use crate::sweep::{TriggerSource, connect, sweep_with_client};
use colored::Colorize;
use std::future::Future;
use std::time::Duration;
use sweeper_core::SweepReport;
use sweeper_gcp::{PubSubSubscriber, ReceivedMessage};

pub async fn handle(
    config: &SweeperConfig,
    subscription: &str,
    max_messages: u32,
    poll_interval: Duration,
) -> anyhow::Result<()> {
    let client = connect(config).await?;
    let subscriber = PubSubSubscriber::new(client, subscription);
    println!(
        "{} {} {}",
        "Listening on".blue().bold(),
        subscriber.subscription().cyan(),
        "(Ctrl-C to stop)".dimmed()
    );

    loop {
        let pulled = tokio::select! {
            result = subscriber.pull(max_messages) => result,
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Stopped".yellow());
                return Ok(());
            }
        };

        let messages = match pulled {
            Ok(messages) => messages,
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) if e.is_server_error() => {
                tracing::debug!(error = %e, "Pub/Sub unavailable, retrying");
                tokio::time::sleep(poll_interval).await;
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Pull failed, backing off");
                tokio::time::sleep(poll_interval).await;
                continue;
            }
        };

        if messages.is_empty() {
            tokio::time::sleep(poll_interval).await;
            continue;
        }

        let trigger = TriggerSource::Message {
            message_id: batch_id(&messages),
        };
        let ack_ids: Vec<String> = messages.into_iter().map(|m| m.ack_id).collect();

        let report = run_batch(
            connect(config),
            || async { subscriber.acknowledge(&ack_ids).await.map_err(anyhow::Error::from) },
            |client| async move { sweep_with_client(&client, config, trigger).await },
        )
        .await;

        match report {
            Some(report) => println!("{} {}", "Sweep finished:".green(), report.summary()),
            None => tokio::time::sleep(poll_interval).await,
        }
    }
}

/// Start a sweep for one batch: connect, acknowledge, then sweep.
///
/// Returns `None` without acknowledging when the connection fails. A failed
/// acknowledge is logged and the sweep still runs.
async fn run_batch<C, Conn, Ack, AckFut, Sweep, SweepFut>(
    connect: Conn,
    acknowledge: Ack,
    sweep: Sweep,
) -> Option<SweepReport>
where
    Conn: Future<Output = anyhow::Result<C>>,
    Ack: FnOnce() -> AckFut,
    AckFut: Future<Output = anyhow::Result<()>>,
    Sweep: FnOnce(C) -> SweepFut,
    SweepFut: Future<Output = SweepReport>,
{
    let client = match connect.await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(
                error = %format!("{:#}", e),
                "Triggered sweep could not start, leaving messages for redelivery"
            );
            return None;
        }
    };

    if let Err(e) = acknowledge().await {
        tracing::warn!(error = %format!("{:#}", e), "Acknowledge failed, batch may be redelivered");
    }

    Some(sweep(client).await)
}

/// Message ids of a batch, comma-joined
fn batch_id(messages: &[ReceivedMessage]) -> String {
    messages
        .iter()
        .map(|m| m.message_id.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
