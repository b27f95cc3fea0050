//! Dataproc cluster adapter
//!
//! Dataproc has no creation timestamp field. The earliest state transition
//! in `statusHistory` (normally CREATING) stands in for it, falling back to
//! the current `status.stateStartTime`.

use crate::client::GcpClient;
use crate::locations::{LocationScope, fan_out};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use sweeper_core::{
    Listing, ResourceAdapter, ResourceDescriptor, ResourceType, parse_timestamp,
};

pub struct DataprocAdapter {
    client: GcpClient,
    scope: LocationScope,
}

impl DataprocAdapter {
    pub fn new(client: GcpClient, scope: LocationScope) -> Self {
        Self { client, scope }
    }

    async fn list_region(&self, region: String) -> crate::Result<Vec<ResourceDescriptor>> {
        let project = self.client.project_id();
        let url = GcpClient::service_url(
            "dataproc",
            &format!("v1/projects/{}/regions/{}/clusters", project, region),
        );
        let clusters: Vec<ApiCluster> = self.client.list_all(&url, "clusters").await?;
        Ok(clusters
            .into_iter()
            .map(|c| descriptor(project, &region, c))
            .collect())
    }
}

#[async_trait]
impl ResourceAdapter for DataprocAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::DataprocCluster
    }

    async fn list(&self) -> sweeper_core::Result<Listing> {
        let regions = self.scope.resolve().await?;
        let timeout = self.client.location_timeout();
        Ok(fan_out(ResourceType::DataprocCluster, regions, timeout, |r| self.list_region(r)).await?)
    }

    async fn delete(&self, id: &str) -> sweeper_core::Result<()> {
        let url = GcpClient::service_url("dataproc", &format!("v1/{}", id));
        let operation = self.client.delete(&url).await?;
        tracing::debug!(resource_id = %id, operation = ?operation, "Cluster deletion accepted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCluster {
    cluster_name: String,
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    status: Option<ApiStatus>,
    #[serde(default)]
    status_history: Vec<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStatus {
    #[serde(default)]
    state_start_time: Option<String>,
}

fn earliest_state_time(cluster: &ApiCluster) -> Option<DateTime<Utc>> {
    cluster
        .status_history
        .iter()
        .chain(cluster.status.iter())
        .filter_map(|s| s.state_start_time.as_deref().and_then(parse_timestamp))
        .min()
}

fn descriptor(project: &str, region: &str, cluster: ApiCluster) -> ResourceDescriptor {
    let created_at = earliest_state_time(&cluster);
    if created_at.is_none() {
        tracing::warn!(cluster = %cluster.cluster_name, "Cluster has no usable state time");
    }

    let mut d = ResourceDescriptor::new(
        format!(
            "projects/{}/regions/{}/clusters/{}",
            project, region, cluster.cluster_name
        ),
        ResourceType::DataprocCluster,
    )
    .with_location(region)
    .with_labels(cluster.labels);
    d.created_at = created_at;
    d
}
