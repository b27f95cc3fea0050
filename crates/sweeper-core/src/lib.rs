//! Sweeper core
//!
//! Provider-neutral engine that reclaims stale cloud resources: every
//! resource older than the age threshold is deleted unless it carries the
//! exemption label.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              sweeper (run/schedule/listen)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │ sweep_once
//! ┌─────────────────▼───────────────────────────────┐
//! │                 sweeper-core                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   SweepCoordinator  (list → evaluate →   │   │
//! │  │                      delete → report)    │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │  SweepPolicy │  │ trait ResourceAdapter │     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼────────────────────────────────────────┐
//! │ sweeper-gcp: composer, gke, dataproc, compute  │
//! │              instances, disks, redis           │
//! └────────────────────────────────────────────────┘
//! ```

pub mod adapter;
pub mod coordinator;
pub mod error;
pub mod policy;
pub mod report;
pub mod resource;

// Re-exports
pub use adapter::{Listing, ResourceAdapter, ScopeFailure};
pub use coordinator::{
    CoordinatorConfig, SweepCoordinator, Verdict, evaluate,
    DEFAULT_CALL_TIMEOUT, DEFAULT_LIST_TIMEOUT, DEFAULT_MAX_CONCURRENT_DELETES,
};
pub use error::{Result, SweepError};
pub use policy::{DEFAULT_MAX_AGE_HOURS, EXEMPTION_LABEL, SweepPolicy, is_exempt, is_expired};
pub use report::{
    EnumerationFailure, ReportSummary, SkipReason, SweepAction, SweepOutcome, SweepReport,
};
pub use resource::{ResourceDescriptor, ResourceType, parse_timestamp};
