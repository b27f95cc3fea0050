//! Resource adapter trait definition

use crate::error::Result;
use crate::resource::{ResourceDescriptor, ResourceType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Uniform list/delete contract over one backend resource type
///
/// Each supported resource type (Composer environments, GKE clusters,
/// compute instances, ...) implements this trait. The coordinator depends on
/// nothing else.
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// The resource type this adapter enumerates
    fn resource_type(&self) -> ResourceType;

    /// Enumerate every resource of this type within the configured scope.
    ///
    /// Adapters that fan out over regions or zones report a failed location
    /// in [`Listing::failures`] and keep going; an `Err` means nothing could
    /// be enumerated at all.
    async fn list(&self) -> Result<Listing>;

    /// Request deletion of a resource.
    ///
    /// For long-running backend operations, acceptance of the request is
    /// success. Implementations must not retry.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Result of enumerating one resource type
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub resources: Vec<ResourceDescriptor>,

    /// Locations that could not be enumerated
    pub failures: Vec<ScopeFailure>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources(resources: Vec<ResourceDescriptor>) -> Self {
        Self {
            resources,
            failures: Vec::new(),
        }
    }

    pub fn push_failure(&mut self, scope: impl Into<String>, error: impl Into<String>) {
        self.failures.push(ScopeFailure {
            scope: scope.into(),
            error: error.into(),
        });
    }
}

/// A single region/zone whose enumeration failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFailure {
    pub scope: String,
    pub error: String,
}
