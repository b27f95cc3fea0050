//! Compute Engine adapters: VM instances and persistent disks
//!
//! Both collections are zonal and share the same listing shape, so one
//! adapter type serves both.

use crate::client::GcpClient;
use crate::locations::{LocationScope, fan_out, last_segment};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use sweeper_core::{
    Listing, ResourceAdapter, ResourceDescriptor, ResourceType, parse_timestamp,
};

/// Which zonal collection an adapter covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeCollection {
    Instances,
    Disks,
}

impl ComputeCollection {
    fn path(self) -> &'static str {
        match self {
            ComputeCollection::Instances => "instances",
            ComputeCollection::Disks => "disks",
        }
    }

    fn resource_type(self) -> ResourceType {
        match self {
            ComputeCollection::Instances => ResourceType::ComputeInstance,
            ComputeCollection::Disks => ResourceType::Disk,
        }
    }
}

pub struct ComputeAdapter {
    client: GcpClient,
    scope: LocationScope,
    collection: ComputeCollection,
}

impl ComputeAdapter {
    pub fn instances(client: GcpClient, scope: LocationScope) -> Self {
        Self {
            client,
            scope,
            collection: ComputeCollection::Instances,
        }
    }

    pub fn disks(client: GcpClient, scope: LocationScope) -> Self {
        Self {
            client,
            scope,
            collection: ComputeCollection::Disks,
        }
    }

    async fn list_zone(&self, zone: String) -> crate::Result<Vec<ResourceDescriptor>> {
        let project = self.client.project_id();
        let url = GcpClient::service_url(
            "compute",
            &format!(
                "compute/v1/projects/{}/zones/{}/{}",
                project,
                zone,
                self.collection.path()
            ),
        );
        let items: Vec<ApiZonalResource> = self.client.list_all(&url, "items").await?;
        Ok(items
            .into_iter()
            .map(|item| descriptor(project, &zone, self.collection, item))
            .collect())
    }
}

#[async_trait]
impl ResourceAdapter for ComputeAdapter {
    fn resource_type(&self) -> ResourceType {
        self.collection.resource_type()
    }

    async fn list(&self) -> sweeper_core::Result<Listing> {
        let zones = self.scope.resolve().await?;
        let timeout = self.client.location_timeout();
        Ok(fan_out(self.collection.resource_type(), zones, timeout, |z| self.list_zone(z)).await?)
    }

    async fn delete(&self, id: &str) -> sweeper_core::Result<()> {
        let url = GcpClient::service_url("compute", &format!("compute/v1/{}", id));
        let operation = self.client.delete(&url).await?;
        tracing::debug!(resource_id = %id, operation = ?operation, "Deletion accepted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiZonalResource {
    name: String,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    creation_timestamp: Option<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
    /// Instances a disk is attached to; absent for instances
    #[serde(default)]
    users: Vec<String>,
}

fn descriptor(
    project: &str,
    zone: &str,
    collection: ComputeCollection,
    item: ApiZonalResource,
) -> ResourceDescriptor {
    let zone = item.zone.as_deref().map(last_segment).unwrap_or(zone).to_string();

    let created_at = item.creation_timestamp.as_deref().and_then(parse_timestamp);
    if created_at.is_none() {
        tracing::warn!(
            name = %item.name,
            raw = ?item.creation_timestamp,
            "Resource has no usable creationTimestamp"
        );
    }

    let mut d = ResourceDescriptor::new(
        format!(
            "projects/{}/zones/{}/{}/{}",
            project,
            zone,
            collection.path(),
            item.name
        ),
        collection.resource_type(),
    )
    .with_location(zone)
    .with_labels(item.labels)
    .with_users(item.users.iter().map(|u| last_segment(u).to_string()).collect());
    d.created_at = created_at;
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_instance_descriptor() {
        let item: ApiZonalResource = serde_json::from_value(json!({
            "id": "8123456789012345678",
            "name": "build-runner-1",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-east1-b",
            "creationTimestamp": "2024-05-30T04:00:00.000-07:00",
            "status": "RUNNING"
        }))
        .unwrap();

        let d = descriptor("p", "us-east1-b", ComputeCollection::Instances, item);
        assert_eq!(d.id, "projects/p/zones/us-east1-b/instances/build-runner-1");
        assert_eq!(d.resource_type, ResourceType::ComputeInstance);
        assert_eq!(
            d.created_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 30, 11, 0, 0).unwrap())
        );
        assert!(d.labels.is_empty());
        assert!(d.users.is_empty());
    }

    #[test]
    fn test_attached_disk_keeps_users() {
        let item: ApiZonalResource = serde_json::from_value(json!({
            "name": "data-disk",
            "creationTimestamp": "2024-05-01T00:00:00.000+00:00",
            "labels": { "please-do-not-kill-me": "true" },
            "users": [
                "https://www.googleapis.com/compute/v1/projects/p/zones/us-east1-b/instances/db-1"
            ]
        }))
        .unwrap();

        let d = descriptor("p", "us-east1-b", ComputeCollection::Disks, item);
        assert_eq!(d.id, "projects/p/zones/us-east1-b/disks/data-disk");
        assert_eq!(d.resource_type, ResourceType::Disk);
        assert_eq!(d.users, vec!["db-1"]);
        assert_eq!(
            d.labels.get("please-do-not-kill-me").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_garbled_timestamp() {
        let item: ApiZonalResource = serde_json::from_value(json!({
            "name": "odd",
            "creationTimestamp": "not-a-date"
        }))
        .unwrap();

        let d = descriptor("p", "europe-west1-d", ComputeCollection::Instances, item);
        assert!(d.created_at.is_none());
        assert_eq!(d.location.as_deref(), Some("europe-west1-d"));
    }
}
