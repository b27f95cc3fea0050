//! Canonical resource descriptors
//!
//! Every adapter translates its backend's native listing into these types so
//! the coordinator can treat all resource kinds identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Kinds of resources the sweeper knows how to reclaim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    /// Managed workflow-orchestration environment (Cloud Composer)
    #[serde(rename = "composer-environment")]
    Orchestration,
    /// Kubernetes cluster (GKE)
    #[serde(rename = "gke-cluster")]
    KubernetesCluster,
    /// Virtual machine instance
    ComputeInstance,
    /// Block storage volume
    #[serde(rename = "compute-disk")]
    Disk,
    /// Managed big-data cluster (Dataproc)
    DataprocCluster,
    /// Managed Redis instance (Memorystore)
    RedisInstance,
}

impl ResourceType {
    /// All supported types, in the order a full sweep visits them
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Orchestration,
        ResourceType::KubernetesCluster,
        ResourceType::DataprocCluster,
        ResourceType::ComputeInstance,
        ResourceType::Disk,
        ResourceType::RedisInstance,
    ];

    /// Stable name used in logs, configuration and reports
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Orchestration => "composer-environment",
            ResourceType::KubernetesCluster => "gke-cluster",
            ResourceType::ComputeInstance => "compute-instance",
            ResourceType::Disk => "compute-disk",
            ResourceType::DataprocCluster => "dataproc-cluster",
            ResourceType::RedisInstance => "redis-instance",
        }
    }

    /// Human readable plural, e.g. for "Cleaning GKE clusters"
    pub fn display_name(self) -> &'static str {
        match self {
            ResourceType::Orchestration => "Composer environments",
            ResourceType::KubernetesCluster => "GKE clusters",
            ResourceType::ComputeInstance => "compute instances",
            ResourceType::Disk => "compute disks",
            ResourceType::DataprocCluster => "Dataproc clusters",
            ResourceType::RedisInstance => "Memorystore Redis instances",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .or(match normalized.as_str() {
                "composer" | "orchestration" => Some(ResourceType::Orchestration),
                "gke" | "kubernetes" => Some(ResourceType::KubernetesCluster),
                "instance" | "vm" => Some(ResourceType::ComputeInstance),
                "disk" => Some(ResourceType::Disk),
                "dataproc" => Some(ResourceType::DataprocCluster),
                "redis" | "memorystore" => Some(ResourceType::RedisInstance),
                _ => None,
            })
            .ok_or_else(|| format!("unknown resource type: {}", s))
    }
}

/// A single resource as seen during one sweep
///
/// Built fresh from a backend listing and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Backend-native identifier, usually the fully-qualified resource name
    pub id: String,

    /// Kind of resource
    pub resource_type: ResourceType,

    /// Region or zone the resource lives in
    pub location: Option<String>,

    /// Creation time; `None` when the backend value was missing or unparsable
    pub created_at: Option<DateTime<Utc>>,

    /// Labels / tags attached to the resource
    pub labels: HashMap<String, String>,

    /// Other resources currently using this one (attached instances of a disk)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            id: id.into(),
            resource_type,
            location: None,
            created_at: None,
            labels: HashMap::new(),
            users: Vec::new(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_users(mut self, users: Vec<String>) -> Self {
        self.users = users;
        self
    }

    /// Last path segment of the id, handy for log lines
    pub fn short_name(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }
}

/// Parse an RFC 3339 timestamp as returned by Google APIs
///
/// Returns `None` instead of an error so callers can fall back to the
/// "unknown creation time" path.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
