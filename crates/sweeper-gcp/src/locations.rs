//! Region and zone discovery, and per-location fan-out

use crate::client::GcpClient;
use crate::error::{GcpError, Result};
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use sweeper_core::{Listing, ResourceDescriptor, ResourceType};
use tokio::sync::OnceCell;

/// Locations listed concurrently per resource type
const LOCATION_CONCURRENCY: usize = 8;

/// Regions and zones of the project, configured or discovered once
#[derive(Debug)]
pub struct LocationCatalog {
    client: GcpClient,
    regions: Option<Vec<String>>,
    zones: Option<Vec<String>>,
    discovered: OnceCell<Discovered>,
}

#[derive(Debug, Clone)]
struct Discovered {
    regions: Vec<String>,
    zones: Vec<String>,
}

impl LocationCatalog {
    /// `None` means "discover from the Compute regions API"
    pub fn new(client: GcpClient, regions: Option<Vec<String>>, zones: Option<Vec<String>>) -> Self {
        Self {
            client,
            regions: regions.filter(|r| !r.is_empty()),
            zones: zones.filter(|z| !z.is_empty()),
            discovered: OnceCell::new(),
        }
    }

    pub async fn regions(&self) -> Result<Vec<String>> {
        if let Some(ref regions) = self.regions {
            return Ok(regions.clone());
        }
        Ok(self.discover().await?.regions.clone())
    }

    /// Configured zones, or discovered zones limited to the configured regions
    pub async fn zones(&self) -> Result<Vec<String>> {
        if let Some(ref zones) = self.zones {
            return Ok(zones.clone());
        }
        let discovered = self.discover().await?;
        Ok(match self.regions {
            Some(ref regions) => discovered
                .zones
                .iter()
                .filter(|z| regions.iter().any(|r| zone_region(z) == r))
                .cloned()
                .collect(),
            None => discovered.zones.clone(),
        })
    }

    async fn discover(&self) -> Result<&Discovered> {
        self.discovered
            .get_or_try_init(|| async {
                let url = GcpClient::service_url(
                    "compute",
                    &format!("compute/v1/projects/{}/regions", self.client.project_id()),
                );
                let regions: Vec<ApiRegion> = self.client.list_all(&url, "items").await?;
                let discovered = discovered_from(regions);
                tracing::debug!(
                    regions = discovered.regions.len(),
                    zones = discovered.zones.len(),
                    "Discovered locations"
                );
                Ok::<_, GcpError>(discovered)
            })
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ApiRegion {
    name: String,
    #[serde(default)]
    zones: Vec<String>,
}

fn discovered_from(regions: Vec<ApiRegion>) -> Discovered {
    let mut names = Vec::with_capacity(regions.len());
    let mut zones = Vec::new();
    for region in regions {
        zones.extend(region.zones.iter().map(|z| last_segment(z).to_string()));
        names.push(region.name);
    }
    Discovered {
        regions: names,
        zones,
    }
}

/// `us-central1-a` → `us-central1`
pub fn zone_region(zone: &str) -> &str {
    zone.rsplit_once('-').map(|(region, _)| region).unwrap_or(zone)
}

/// Last `/`-separated segment of a resource URL or path
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Which locations an adapter enumerates
#[derive(Debug, Clone)]
pub enum LocationScope {
    /// Every region from the catalog
    Regions(Arc<LocationCatalog>),
    /// Every zone from the catalog
    Zones(Arc<LocationCatalog>),
    /// An explicit per-type override
    Fixed(Vec<String>),
}

impl LocationScope {
    pub async fn resolve(&self) -> Result<Vec<String>> {
        match self {
            LocationScope::Regions(catalog) => catalog.regions().await,
            LocationScope::Zones(catalog) => catalog.zones().await,
            LocationScope::Fixed(locations) => Ok(locations.clone()),
        }
    }
}

/// List one resource type across many locations.
///
/// Each location is bounded by `timeout`. Unsupported locations contribute
/// nothing. Timeouts and other per-location errors are recorded as scope
/// failures, except credential and permission errors, which abort the whole
/// listing since every location would fail the same way.
pub(crate) async fn fan_out<F, Fut>(
    resource_type: ResourceType,
    locations: Vec<String>,
    timeout: Duration,
    list_location: F,
) -> Result<Listing>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<ResourceDescriptor>>>,
{
    let results: Vec<(String, Option<Result<Vec<ResourceDescriptor>>>)> = stream::iter(locations)
        .map(|location| {
            let fut = tokio::time::timeout(timeout, list_location(location.clone()));
            async move { (location, fut.await.ok()) }
        })
        .buffer_unordered(LOCATION_CONCURRENCY)
        .collect()
        .await;

    let mut listing = Listing::new();
    for (location, result) in results {
        match result {
            None => {
                listing.push_failure(
                    location,
                    format!("listing timed out after {}s", timeout.as_secs_f64()),
                );
            }
            Some(Ok(resources)) => {
                tracing::debug!(
                    resource_type = %resource_type,
                    scope = %location,
                    count = resources.len(),
                    "Listed location"
                );
                listing.resources.extend(resources);
            }
            Some(Err(e)) if e.is_unsupported_location() => {
                tracing::debug!(
                    resource_type = %resource_type,
                    scope = %location,
                    "Location not supported, skipping"
                );
            }
            Some(Err(e)) if e.is_auth() || matches!(e, GcpError::PermissionDenied(_)) => {
                return Err(e);
            }
            Some(Err(e)) => listing.push_failure(location, e.to_string()),
        }
    }
    Ok(listing)
}
