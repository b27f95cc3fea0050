//! Memorystore for Redis adapter

use crate::client::GcpClient;
use crate::locations::{LocationScope, fan_out};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use sweeper_core::{
    Listing, ResourceAdapter, ResourceDescriptor, ResourceType, parse_timestamp,
};

pub struct RedisAdapter {
    client: GcpClient,
    scope: LocationScope,
}

impl RedisAdapter {
    pub fn new(client: GcpClient, scope: LocationScope) -> Self {
        Self { client, scope }
    }

    async fn list_region(&self, region: String) -> crate::Result<Vec<ResourceDescriptor>> {
        let url = GcpClient::service_url(
            "redis",
            &format!(
                "v1/projects/{}/locations/{}/instances",
                self.client.project_id(),
                region
            ),
        );
        let instances: Vec<ApiInstance> = self.client.list_all(&url, "instances").await?;
        Ok(instances
            .into_iter()
            .map(|i| descriptor(&region, i))
            .collect())
    }
}

#[async_trait]
impl ResourceAdapter for RedisAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::RedisInstance
    }

    async fn list(&self) -> sweeper_core::Result<Listing> {
        let regions = self.scope.resolve().await?;
        let timeout = self.client.location_timeout();
        Ok(fan_out(ResourceType::RedisInstance, regions, timeout, |r| self.list_region(r)).await?)
    }

    async fn delete(&self, id: &str) -> sweeper_core::Result<()> {
        let url = GcpClient::service_url("redis", &format!("v1/{}", id));
        let operation = self.client.delete(&url).await?;
        tracing::debug!(resource_id = %id, operation = ?operation, "Instance deletion accepted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInstance {
    name: String,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

fn descriptor(region: &str, instance: ApiInstance) -> ResourceDescriptor {
    let created_at = instance.create_time.as_deref().and_then(parse_timestamp);
    if created_at.is_none() {
        tracing::warn!(instance = %instance.name, "Instance has no usable createTime");
    }
    let mut d = ResourceDescriptor::new(instance.name, ResourceType::RedisInstance)
        .with_location(region)
        .with_labels(instance.labels);
    d.created_at = created_at;
    d
}
