//! Cloud Composer environment adapter

use crate::client::GcpClient;
use crate::locations::{LocationScope, fan_out, last_segment};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use sweeper_core::{
    Listing, ResourceAdapter, ResourceDescriptor, ResourceType, parse_timestamp,
};

pub struct ComposerAdapter {
    client: GcpClient,
    scope: LocationScope,
}

impl ComposerAdapter {
    pub fn new(client: GcpClient, scope: LocationScope) -> Self {
        Self { client, scope }
    }

    async fn list_region(&self, region: String) -> crate::Result<Vec<ResourceDescriptor>> {
        let url = GcpClient::service_url(
            "composer",
            &format!(
                "v1/projects/{}/locations/{}/environments",
                self.client.project_id(),
                region
            ),
        );
        let environments: Vec<ApiEnvironment> = self.client.list_all(&url, "environments").await?;
        Ok(environments
            .into_iter()
            .map(|env| descriptor(&region, env))
            .collect())
    }
}

#[async_trait]
impl ResourceAdapter for ComposerAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Orchestration
    }

    async fn list(&self) -> sweeper_core::Result<Listing> {
        let regions = self.scope.resolve().await?;
        let timeout = self.client.location_timeout();
        Ok(fan_out(ResourceType::Orchestration, regions, timeout, |r| self.list_region(r)).await?)
    }

    async fn delete(&self, id: &str) -> sweeper_core::Result<()> {
        let url = GcpClient::service_url("composer", &format!("v1/{}", id));
        let operation = self.client.delete(&url).await?;
        tracing::debug!(resource_id = %id, operation = ?operation, "Environment deletion accepted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEnvironment {
    name: String,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

fn descriptor(region: &str, env: ApiEnvironment) -> ResourceDescriptor {
    // Older environments may lack createTime; updateTime is what the
    // cleanup job historically used.
    let created_at = env
        .create_time
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| env.update_time.as_deref().and_then(parse_timestamp));

    if created_at.is_none() {
        tracing::warn!(environment = %last_segment(&env.name), "Environment has no usable timestamp");
    }

    let mut d = ResourceDescriptor::new(env.name, ResourceType::Orchestration)
        .with_location(region)
        .with_labels(env.labels);
    d.created_at = created_at;
    d
}
