//! Sweep coordinator
//!
//! Runs the list → evaluate → delete pipeline over a set of adapters and
//! folds every result into one [`SweepReport`]. Nothing in here returns an
//! error: enumeration and deletion failures become report entries.

use crate::adapter::ResourceAdapter;
use crate::error::SweepError;
use crate::policy::SweepPolicy;
use crate::report::{SkipReason, SweepOutcome, SweepReport};
use crate::resource::ResourceDescriptor;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default number of deletions in flight per resource type
pub const DEFAULT_MAX_CONCURRENT_DELETES: usize = 8;

/// Default bound on a single delete call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default deadline for enumerating one resource type across all locations
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Execution limits for a sweep
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Deletions in flight per resource type
    pub max_concurrent_deletes: usize,

    /// Timeout applied to every delete call
    pub call_timeout: Duration,

    /// Overall deadline for one adapter's `list`. Adapters bound their own
    /// per-location calls, so this only trips on a listing that never ends.
    pub list_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_deletes: DEFAULT_MAX_CONCURRENT_DELETES,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }
}

/// Decision for a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Delete,
    Skip(SkipReason),
}

/// Decide what to do with a resource. Pure.
pub fn evaluate(resource: &ResourceDescriptor, policy: &SweepPolicy, now: DateTime<Utc>) -> Verdict {
    if policy.is_exempt(&resource.labels) {
        return Verdict::Skip(SkipReason::Exempt);
    }

    let Some(created_at) = resource.created_at else {
        return Verdict::Skip(SkipReason::UnknownCreationTime);
    };

    if !policy.is_expired(created_at, now) {
        return Verdict::Skip(SkipReason::NotExpired);
    }

    if !resource.users.is_empty() {
        return Verdict::Skip(SkipReason::InUse);
    }

    if policy.dry_run {
        return Verdict::Skip(SkipReason::DryRun);
    }

    Verdict::Delete
}

/// Orchestrates one sweep across all registered adapters
#[derive(Debug, Clone, Default)]
pub struct SweepCoordinator {
    config: CoordinatorConfig,
}

impl SweepCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    /// Run a sweep, capturing "now" once at the start
    pub async fn run(
        &self,
        adapters: &[Arc<dyn ResourceAdapter>],
        policy: &SweepPolicy,
    ) -> SweepReport {
        self.run_at(adapters, policy, Utc::now()).await
    }

    /// Run a sweep judging every resource against `now`
    pub async fn run_at(
        &self,
        adapters: &[Arc<dyn ResourceAdapter>],
        policy: &SweepPolicy,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let started = Instant::now();
        info!(
            adapters = adapters.len(),
            max_age_hours = policy.max_age.num_hours(),
            exemption_key = %policy.exemption_key,
            dry_run = policy.dry_run,
            "Starting sweep"
        );

        let partials = join_all(
            adapters
                .iter()
                .map(|adapter| self.sweep_adapter(adapter.as_ref(), policy, now)),
        )
        .await;

        let mut report = SweepReport::new(now);
        for partial in partials {
            report.merge(partial);
        }
        report.finished_at = Utc::now();
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            duration_ms = report.duration_ms,
            "Sweep finished: {}",
            report.summary()
        );
        report
    }

    async fn sweep_adapter(
        &self,
        adapter: &dyn ResourceAdapter,
        policy: &SweepPolicy,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let resource_type = adapter.resource_type();
        let mut report = SweepReport::new(now);

        info!(resource_type = %resource_type, "Attempting to clean {}", resource_type.display_name());

        let listing = self
            .bounded("list", self.config.list_timeout, adapter.list())
            .await;
        let listing = match listing {
            Ok(listing) => listing,
            Err(e) => {
                warn!(resource_type = %resource_type, error = %e, "Failed to enumerate");
                report.push_enumeration_failure(resource_type, None, e.to_string());
                return report;
            }
        };

        for failure in listing.failures {
            warn!(
                resource_type = %resource_type,
                scope = %failure.scope,
                error = %failure.error,
                "Failed to enumerate location"
            );
            report.push_enumeration_failure(resource_type, Some(failure.scope), failure.error);
        }

        let mut seen = HashSet::new();
        let mut to_delete = Vec::new();
        for resource in listing.resources {
            if !seen.insert(resource.id.clone()) {
                debug!(resource_id = %resource.id, "Duplicate listing entry ignored");
                continue;
            }

            match evaluate(&resource, policy, now) {
                Verdict::Skip(reason) => {
                    debug!(
                        resource_type = %resource_type,
                        resource_id = %resource.id,
                        reason = %reason,
                        "Skipped"
                    );
                    report.push(SweepOutcome::skipped(resource_type, resource.id, reason));
                }
                Verdict::Delete => to_delete.push(resource),
            }
        }

        let limit = self.config.max_concurrent_deletes.max(1);
        let deletions: Vec<SweepOutcome> = stream::iter(to_delete)
            .map(|resource| self.delete_one(adapter, resource))
            .buffer_unordered(limit)
            .collect()
            .await;

        for outcome in deletions {
            report.push(outcome);
        }

        info!(
            resource_type = %resource_type,
            "Cleaning of {} done: {}",
            resource_type.display_name(),
            report.summary()
        );
        report
    }

    async fn delete_one(
        &self,
        adapter: &dyn ResourceAdapter,
        resource: ResourceDescriptor,
    ) -> SweepOutcome {
        let resource_type = resource.resource_type;
        info!(resource_type = %resource_type, resource_id = %resource.id, "Deleting");

        let result = self
            .bounded("delete", self.config.call_timeout, adapter.delete(&resource.id))
            .await;
        match result {
            Ok(()) => {
                info!(resource_type = %resource_type, resource_id = %resource.id, "Deleted");
                SweepOutcome::deleted(resource_type, resource.id)
            }
            Err(e) => {
                warn!(
                    resource_type = %resource_type,
                    resource_id = %resource.id,
                    error = %e,
                    "Failed to delete"
                );
                SweepOutcome::failed(resource_type, resource.id, e.to_string())
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: &str,
        limit: Duration,
        fut: impl Future<Output = crate::Result<T>>,
    ) -> crate::Result<T> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(SweepError::Timeout(format!(
                "{} call exceeded {}s",
                call,
                limit.as_secs_f64()
            ))),
        }
    }
}
