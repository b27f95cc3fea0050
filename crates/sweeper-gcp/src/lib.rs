//! Google Cloud adapters for the sweeper
//!
//! Implements [`sweeper_core::ResourceAdapter`] for every resource type the
//! sweeper reclaims, on top of the public REST APIs.
//!
//! # Supported resources
//!
//! - **Cloud Composer** environments (regional)
//! - **GKE** clusters (all locations in one call)
//! - **Dataproc** clusters (regional)
//! - **Compute Engine** instances and disks (zonal)
//! - **Memorystore for Redis** instances (regional)
//!
//! # Requirements
//!
//! An access token must be obtainable from `GOOGLE_OAUTH_ACCESS_TOKEN`, the
//! `gcloud` CLI, or the metadata server (see [`auth`]).
//!
//! # Example
//!
//! ```ignore
//! use sweeper_gcp::{AuthMethod, GcpClient, LocationCatalog, TokenSource, build_adapters};
//!
//! let http = GcpClient::http_client(std::time::Duration::from_secs(60))?;
//! let tokens = TokenSource::resolve(AuthMethod::Auto, http.clone()).await?;
//! let client = GcpClient::new("my-project", http, tokens);
//! let catalog = std::sync::Arc::new(LocationCatalog::new(client.clone(), None, None));
//! let adapters = build_adapters(&client, &catalog, &ResourceType::ALL, &Default::default(), None);
//! ```

pub mod auth;
pub mod client;
pub mod composer;
pub mod compute;
pub mod dataproc;
pub mod error;
pub mod gke;
pub mod locations;
pub mod pubsub;
pub mod redis;

pub use auth::{AuthMethod, TOKEN_ENV, TokenSource, detect_project_id};
pub use client::GcpClient;
pub use composer::ComposerAdapter;
pub use compute::{ComputeAdapter, ComputeCollection};
pub use dataproc::DataprocAdapter;
pub use error::{GcpError, Result};
pub use gke::GkeClusterAdapter;
pub use locations::{LocationCatalog, LocationScope};
pub use pubsub::{PubSubSubscriber, ReceivedMessage};
pub use redis::RedisAdapter;

use std::collections::HashMap;
use std::sync::Arc;
use sweeper_core::{ResourceAdapter, ResourceType};

/// Build one adapter per requested type, in the given order.
///
/// `overrides` pins a type to explicit locations; `gke_regions` limits the
/// otherwise project-wide GKE listing.
pub fn build_adapters(
    client: &GcpClient,
    catalog: &Arc<LocationCatalog>,
    types: &[ResourceType],
    overrides: &HashMap<ResourceType, Vec<String>>,
    gke_regions: Option<Vec<String>>,
) -> Vec<Arc<dyn ResourceAdapter>> {
    types
        .iter()
        .map(|&resource_type| {
            let pinned = overrides.get(&resource_type).filter(|l| !l.is_empty()).cloned();
            let regional = || match pinned.clone() {
                Some(locations) => LocationScope::Fixed(locations),
                None => LocationScope::Regions(catalog.clone()),
            };
            let zonal = || match pinned.clone() {
                Some(locations) => LocationScope::Fixed(locations),
                None => LocationScope::Zones(catalog.clone()),
            };

            let adapter: Arc<dyn ResourceAdapter> = match resource_type {
                ResourceType::Orchestration => {
                    Arc::new(ComposerAdapter::new(client.clone(), regional()))
                }
                ResourceType::KubernetesCluster => Arc::new(
                    GkeClusterAdapter::new(client.clone())
                        .with_locations(pinned.clone().or_else(|| gke_regions.clone())),
                ),
                ResourceType::DataprocCluster => {
                    Arc::new(DataprocAdapter::new(client.clone(), regional()))
                }
                ResourceType::ComputeInstance => {
                    Arc::new(ComputeAdapter::instances(client.clone(), zonal()))
                }
                ResourceType::Disk => Arc::new(ComputeAdapter::disks(client.clone(), zonal())),
                ResourceType::RedisInstance => {
                    Arc::new(RedisAdapter::new(client.clone(), regional()))
                }
            };
            adapter
        })
        .collect()
}
