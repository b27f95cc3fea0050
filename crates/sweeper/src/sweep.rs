//! One sweep, independent of what triggered it

use crate::config::SweeperConfig;
use anyhow::Context;
use std::sync::Arc;
use sweeper_core::{ResourceType, SweepCoordinator, SweepReport};
use sweeper_gcp::{GcpClient, LocationCatalog, TokenSource, build_adapters, detect_project_id};

/// What asked for the sweep. Only used for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSource {
    Manual,
    Schedule,
    Message { message_id: String },
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Manual => write!(f, "manual"),
            TriggerSource::Schedule => write!(f, "schedule"),
            TriggerSource::Message { message_id } => write!(f, "message:{}", message_id),
        }
    }
}

/// Authenticated client for the configured project
pub async fn connect(config: &SweeperConfig) -> anyhow::Result<GcpClient> {
    let http = GcpClient::http_client(config.call_timeout)?;
    let tokens = TokenSource::resolve(config.auth, http.clone())
        .await
        .context("Failed to obtain an access token")?;
    tracing::debug!(source = tokens.label(), "Access token source resolved");

    let project = match config.project.clone() {
        Some(project) => project,
        None => detect_project_id(&http).await.context(
            "No project configured: pass --project, set SWEEPER_PROJECT or GOOGLE_CLOUD_PROJECT",
        )?,
    };

    Ok(GcpClient::new(project, http, tokens).with_location_timeout(config.call_timeout))
}

/// Enumerate, evaluate and delete across every configured resource type.
///
/// Errors only when the sweep cannot start (no credentials, no project).
/// Per-resource and per-type failures are reported in the returned report.
pub async fn sweep_once(
    config: &SweeperConfig,
    trigger: TriggerSource,
) -> anyhow::Result<SweepReport> {
    let client = connect(config).await?;
    Ok(sweep_with_client(&client, config, trigger).await)
}

/// Same as [`sweep_once`], reusing an existing client
pub async fn sweep_with_client(
    client: &GcpClient,
    config: &SweeperConfig,
    trigger: TriggerSource,
) -> SweepReport {
    tracing::info!(
        project = %client.project_id(),
        trigger = %trigger,
        types = %type_list(&config.types),
        "Sweep triggered"
    );

    let catalog = Arc::new(LocationCatalog::new(
        client.clone(),
        config.regions.clone(),
        config.zones.clone(),
    ));
    let adapters = build_adapters(
        client,
        &catalog,
        &config.types,
        &config.locations,
        config.regions.clone(),
    );

    let coordinator = SweepCoordinator::new(config.coordinator_config());
    coordinator.run(&adapters, &config.policy()).await
}

fn type_list(types: &[ResourceType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_display() {
        assert_eq!(TriggerSource::Manual.to_string(), "manual");
        assert_eq!(TriggerSource::Schedule.to_string(), "schedule");
        assert_eq!(
            TriggerSource::Message {
                message_id: "42".to_string()
            }
            .to_string(),
            "message:42"
        );
    }

    #[test]
    fn test_type_list() {
        assert_eq!(
            type_list(&[ResourceType::ComputeInstance, ResourceType::Disk]),
            "compute-instance,compute-disk"
        );
    }
}
