//! GKE cluster adapter
//!
//! The container API lists clusters of every location in one call
//! (`locations/-`); zones it could not reach come back in `missingZones`.

use crate::client::GcpClient;
use crate::locations::zone_region;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use sweeper_core::{
    Listing, ResourceAdapter, ResourceDescriptor, ResourceType, parse_timestamp,
};

pub struct GkeClusterAdapter {
    client: GcpClient,
    locations: Option<Vec<String>>,
}

impl GkeClusterAdapter {
    pub fn new(client: GcpClient) -> Self {
        Self {
            client,
            locations: None,
        }
    }

    /// Only keep clusters in these regions (or zones within them)
    pub fn with_locations(mut self, locations: Option<Vec<String>>) -> Self {
        self.locations = locations.filter(|l| !l.is_empty());
        self
    }
}

fn in_scope(locations: &Option<Vec<String>>, location: &str) -> bool {
    match locations {
        None => true,
        Some(allowed) => allowed
            .iter()
            .any(|l| l == location || l == zone_region(location)),
    }
}

#[async_trait]
impl ResourceAdapter for GkeClusterAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::KubernetesCluster
    }

    async fn list(&self) -> sweeper_core::Result<Listing> {
        let url = GcpClient::service_url(
            "container",
            &format!("v1/projects/{}/locations/-/clusters", self.client.project_id()),
        );
        let response: ApiListClusters = self.client.get_json(&url, &[]).await?;
        let mut listing = listing_from(self.client.project_id(), response);
        listing.resources.retain(|r| {
            in_scope(&self.locations, r.location.as_deref().unwrap_or_default())
        });
        listing.failures.retain(|f| in_scope(&self.locations, &f.scope));
        Ok(listing)
    }

    async fn delete(&self, id: &str) -> sweeper_core::Result<()> {
        let url = GcpClient::service_url("container", &format!("v1/{}", id));
        let operation = self.client.delete(&url).await?;
        tracing::debug!(resource_id = %id, operation = ?operation, "Cluster deletion accepted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiListClusters {
    #[serde(default)]
    clusters: Vec<ApiCluster>,
    #[serde(default)]
    missing_zones: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCluster {
    name: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    resource_labels: HashMap<String, String>,
}

fn listing_from(project: &str, response: ApiListClusters) -> Listing {
    let mut listing = Listing::from_resources(
        response
            .clusters
            .into_iter()
            .map(|c| descriptor(project, c))
            .collect(),
    );
    for zone in response.missing_zones {
        listing.push_failure(zone, "zone unreachable from the container API");
    }
    listing
}

fn descriptor(project: &str, cluster: ApiCluster) -> ResourceDescriptor {
    let location = cluster
        .location
        .or(cluster.zone)
        .unwrap_or_else(|| "-".to_string());

    let created_at = cluster.create_time.as_deref().and_then(parse_timestamp);
    if created_at.is_none() {
        tracing::warn!(
            cluster = %cluster.name,
            raw = ?cluster.create_time,
            "Cluster has no usable createTime"
        );
    }

    let mut d = ResourceDescriptor::new(
        format!(
            "projects/{}/locations/{}/clusters/{}",
            project, location, cluster.name
        ),
        ResourceType::KubernetesCluster,
    )
    .with_location(location)
    .with_labels(cluster.resource_labels);
    d.created_at = created_at;
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_clusters_response_to_listing() {
        let response: ApiListClusters = serde_json::from_value(json!({
            "clusters": [
                {
                    "name": "ci-cluster",
                    "location": "us-central1",
                    "zone": "us-central1",
                    "createTime": "2024-05-30T09:15:00+00:00",
                    "resourceLabels": { "please-do-not-kill-me": "" }
                },
                {
                    "name": "legacy",
                    "zone": "europe-west1-b",
                    "createTime": "2024-05-01T00:00:00+00:00"
                }
            ],
            "missingZones": ["asia-east1-a"]
        }))
        .unwrap();

        let listing = listing_from("proj", response);
        assert_eq!(listing.resources.len(), 2);

        let first = &listing.resources[0];
        assert_eq!(first.id, "projects/proj/locations/us-central1/clusters/ci-cluster");
        assert_eq!(
            first.created_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 30, 9, 15, 0).unwrap())
        );
        assert!(first.labels.contains_key("please-do-not-kill-me"));

        // falls back to the deprecated zone field
        assert_eq!(
            listing.resources[1].id,
            "projects/proj/locations/europe-west1-b/clusters/legacy"
        );

        assert_eq!(listing.failures.len(), 1);
        assert_eq!(listing.failures[0].scope, "asia-east1-a");
    }

    #[test]
    fn test_location_filter() {
        let only_us = Some(vec!["us-central1".to_string()]);
        assert!(in_scope(&only_us, "us-central1"));
        assert!(in_scope(&only_us, "us-central1-f"));
        assert!(!in_scope(&only_us, "europe-west1-b"));
        assert!(in_scope(&None, "anything"));
    }

    #[test]
    fn test_empty_response() {
        let response: ApiListClusters = serde_json::from_value(json!({})).unwrap();
        let listing = listing_from("proj", response);
        assert!(listing.resources.is_empty());
        assert!(listing.failures.is_empty());
    }
}
