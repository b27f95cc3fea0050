//! Age and exemption rules applied to every resource

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label that keeps a resource alive regardless of its age
pub const EXEMPTION_LABEL: &str = "please-do-not-kill-me";

/// Default age threshold in hours
pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

/// Returns true iff `now - created_at >= max_age`.
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now.signed_duration_since(created_at) >= max_age
}

/// Returns true iff the labels carry the default exemption key.
///
/// The value is not inspected.
pub fn is_exempt(labels: &HashMap<String, String>) -> bool {
    labels.contains_key(EXEMPTION_LABEL)
}

/// Policy a sweep evaluates resources against
///
/// Constant for the lifetime of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPolicy {
    /// Minimum age before a resource may be deleted
    #[serde(with = "duration_hours")]
    pub max_age: Duration,

    /// Label key marking a resource as exempt
    pub exemption_key: String,

    /// When set, the exemption label must carry exactly this value
    pub exemption_value: Option<String>,

    /// Evaluate without deleting anything
    pub dry_run: bool,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(DEFAULT_MAX_AGE_HOURS),
            exemption_key: EXEMPTION_LABEL.to_string(),
            exemption_value: None,
            dry_run: false,
        }
    }
}

impl SweepPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_exemption_key(mut self, key: impl Into<String>) -> Self {
        self.exemption_key = key.into();
        self
    }

    pub fn with_exemption_value(mut self, value: Option<String>) -> Self {
        self.exemption_value = value;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Exemption check using the configured key (and value, if any)
    pub fn is_exempt(&self, labels: &HashMap<String, String>) -> bool {
        match (labels.get(&self.exemption_key), &self.exemption_value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
        }
    }

    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        is_expired(created_at, now, self.max_age)
    }
}

mod duration_hours {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.num_seconds() as f64 / 3600.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let hours = f64::deserialize(d)?;
        Ok(Duration::seconds((hours * 3600.0).round() as i64))
    }
}
