//! Deployment configuration
//!
//! Settings come from, in order of precedence: command-line flags and their
//! environment variables, an optional YAML file, built-in defaults.

use clap::{Args, ValueEnum};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use sweeper_core::{
    CoordinatorConfig, DEFAULT_MAX_AGE_HOURS, DEFAULT_MAX_CONCURRENT_DELETES, EXEMPTION_LABEL,
    ResourceType, SweepPolicy,
};
use sweeper_gcp::AuthMethod;
use thiserror::Error;

/// Default per-call timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default deadline for listing one resource type, in seconds
pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 20 * 60;

/// Fallback project variable set by most Google tooling
pub const PROJECT_FALLBACK_ENV: &str = "GOOGLE_CLOUD_PROJECT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// YAML config file
    #[arg(long, global = true, env = "SWEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project to sweep (falls back to GOOGLE_CLOUD_PROJECT, then gcloud / metadata)
    #[arg(long, global = true, env = "SWEEPER_PROJECT")]
    pub project: Option<String>,

    /// Minimum age in hours before a resource is deleted
    #[arg(long, global = true, env = "SWEEPER_MAX_AGE_HOURS")]
    pub max_age_hours: Option<u64>,

    /// Label key that exempts a resource
    #[arg(long, global = true, env = "SWEEPER_LABEL_KEY")]
    pub label_key: Option<String>,

    /// Require this exact value on the exemption label
    #[arg(long, global = true, env = "SWEEPER_LABEL_VALUE")]
    pub label_value: Option<String>,

    /// Regions to scan (repeatable; default: all regions of the project)
    #[arg(long = "region", global = true, env = "SWEEPER_REGIONS", value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Zones to scan (repeatable; default: all zones of the scanned regions)
    #[arg(long = "zone", global = true, env = "SWEEPER_ZONES", value_delimiter = ',')]
    pub zones: Vec<String>,

    /// Only sweep these resource types (repeatable)
    #[arg(long = "only", global = true, env = "SWEEPER_TYPES", value_delimiter = ',')]
    pub only: Vec<String>,

    /// Deletions in flight per resource type
    #[arg(long, global = true, env = "SWEEPER_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Timeout for listing one location or deleting one resource, in seconds
    #[arg(long, global = true, env = "SWEEPER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Deadline for listing one resource type across all locations, in seconds
    #[arg(long, global = true, env = "SWEEPER_LIST_TIMEOUT_SECS")]
    pub list_timeout_secs: Option<u64>,

    /// Token source: auto, env, gcloud or metadata
    #[arg(long, global = true, env = "SWEEPER_AUTH")]
    pub auth: Option<String>,

    /// Evaluate everything but delete nothing
    #[arg(long, global = true, env = "SWEEPER_DRY_RUN")]
    pub dry_run: bool,

    /// Log output format [default: text]
    #[arg(long, global = true, value_enum, env = "SWEEPER_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

/// On-disk configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub project: Option<String>,
    pub max_age_hours: Option<u64>,
    pub exemption: Option<FileExemption>,
    pub regions: Vec<String>,
    pub zones: Vec<String>,
    pub types: Vec<ResourceType>,
    pub locations: HashMap<ResourceType, Vec<String>>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub list_timeout_secs: Option<u64>,
    pub auth: Option<String>,
    pub dry_run: Option<bool>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileExemption {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<config_dir>/gcp-sweeper/sweeper.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gcp-sweeper").join("sweeper.yaml"))
}

/// Fully resolved configuration for one process
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub project: Option<String>,
    pub max_age: chrono::Duration,
    pub exemption_key: String,
    pub exemption_value: Option<String>,
    pub regions: Option<Vec<String>>,
    pub zones: Option<Vec<String>>,
    pub types: Vec<ResourceType>,
    pub locations: HashMap<ResourceType, Vec<String>>,
    pub concurrency: usize,
    pub call_timeout: std::time::Duration,
    pub list_timeout: std::time::Duration,
    pub auth: AuthMethod,
    pub dry_run: bool,
    pub log_format: LogFormat,
    /// File the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl SweeperConfig {
    /// Resolve flags against the config file and defaults
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let (file, source) = match args.config {
            Some(ref path) => (FileConfig::from_path(path)?, Some(path.clone())),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => (FileConfig::from_path(&path)?, Some(path)),
                None => (FileConfig::default(), None),
            },
        };

        let mut config = Self::merge(args, file)?;
        config.source = source;
        Ok(config)
    }

    pub fn merge(args: &ConfigArgs, file: FileConfig) -> Result<Self> {
        let project = args
            .project
            .clone()
            .or(file.project)
            .or_else(|| std::env::var(PROJECT_FALLBACK_ENV).ok())
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let max_age_hours = args
            .max_age_hours
            .or(file.max_age_hours)
            .unwrap_or(DEFAULT_MAX_AGE_HOURS as u64);
        if max_age_hours == 0 {
            return Err(ConfigError::Invalid(
                "max_age_hours must be greater than 0".to_string(),
            ));
        }
        let max_age = i64::try_from(max_age_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("max_age_hours {} is out of range", max_age_hours))
            })?;

        let file_exemption = file.exemption.unwrap_or_default();
        let exemption_key = args
            .label_key
            .clone()
            .or(file_exemption.key)
            .unwrap_or_else(|| EXEMPTION_LABEL.to_string());
        if exemption_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "exemption label key must not be empty".to_string(),
            ));
        }
        let exemption_value = args.label_value.clone().or(file_exemption.value);

        let types = if !args.only.is_empty() {
            args.only
                .iter()
                .map(|t| t.parse::<ResourceType>().map_err(ConfigError::Invalid))
                .collect::<Result<Vec<_>>>()?
        } else if !file.types.is_empty() {
            file.types
        } else {
            ResourceType::ALL.to_vec()
        };
        // keep the sweep order stable regardless of how types were listed
        let types: Vec<ResourceType> = ResourceType::ALL
            .into_iter()
            .filter(|t| types.contains(t))
            .collect();

        let concurrency = args
            .concurrency
            .or(file.concurrency)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_DELETES);
        if concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be greater than 0".to_string(),
            ));
        }

        let timeout_secs = args
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        let list_timeout_secs = args
            .list_timeout_secs
            .or(file.list_timeout_secs)
            .unwrap_or(DEFAULT_LIST_TIMEOUT_SECS);
        if list_timeout_secs < timeout_secs {
            return Err(ConfigError::Invalid(format!(
                "list_timeout_secs ({}) must not be shorter than timeout_secs ({})",
                list_timeout_secs, timeout_secs
            )));
        }

        let auth = match args.auth.clone().or(file.auth) {
            Some(raw) => raw.parse::<AuthMethod>().map_err(ConfigError::Invalid)?,
            None => AuthMethod::Auto,
        };

        Ok(Self {
            project,
            max_age,
            exemption_key,
            exemption_value,
            regions: non_empty(if args.regions.is_empty() {
                file.regions
            } else {
                args.regions.clone()
            }),
            zones: non_empty(if args.zones.is_empty() {
                file.zones
            } else {
                args.zones.clone()
            }),
            types,
            locations: file.locations,
            concurrency,
            call_timeout: std::time::Duration::from_secs(timeout_secs),
            list_timeout: std::time::Duration::from_secs(list_timeout_secs),
            auth,
            dry_run: args.dry_run || file.dry_run.unwrap_or(false),
            log_format: args.log_format.or(file.log_format).unwrap_or_default(),
            source: None,
        })
    }

    pub fn policy(&self) -> SweepPolicy {
        SweepPolicy::new()
            .with_max_age(self.max_age)
            .with_exemption_key(self.exemption_key.clone())
            .with_exemption_value(self.exemption_value.clone())
            .with_dry_run(self.dry_run)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            max_concurrent_deletes: self.concurrency,
            call_timeout: self.call_timeout,
            list_timeout: self.list_timeout,
        }
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    let values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() { None } else { Some(values) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = temp_env::with_var(PROJECT_FALLBACK_ENV, None::<&str>, || {
            SweeperConfig::merge(&ConfigArgs::default(), FileConfig::default()).unwrap()
        });

        assert_eq!(config.project, None);
        assert_eq!(config.max_age, chrono::Duration::hours(24));
        assert_eq!(config.exemption_key, "please-do-not-kill-me");
        assert_eq!(config.exemption_value, None);
        assert_eq!(config.types, ResourceType::ALL.to_vec());
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.call_timeout, std::time::Duration::from_secs(60));
        assert_eq!(config.auth, AuthMethod::Auto);
        assert!(config.regions.is_none());
    }

    #[test]
    #[serial]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweeper.yaml");
        fs::write(
            &path,
            r#"
project: dev-sandbox
max_age_hours: 48
exemption:
  key: keep-me
  value: "yes"
regions: [us-east1, europe-west1]
types: [compute-disk, gke-cluster]
locations:
  dataproc-cluster: [europe-west4]
concurrency: 2
auth: gcloud
"#,
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(path.clone()),
            ..ConfigArgs::default()
        };
        let config = SweeperConfig::load(&args).unwrap();

        assert_eq!(config.project.as_deref(), Some("dev-sandbox"));
        assert_eq!(config.max_age, chrono::Duration::hours(48));
        assert_eq!(config.exemption_key, "keep-me");
        assert_eq!(config.exemption_value.as_deref(), Some("yes"));
        assert_eq!(
            config.regions,
            Some(vec!["us-east1".to_string(), "europe-west1".to_string()])
        );
        // sweep order, not file order
        assert_eq!(
            config.types,
            vec![ResourceType::KubernetesCluster, ResourceType::Disk]
        );
        assert_eq!(
            config.locations.get(&ResourceType::DataprocCluster),
            Some(&vec!["europe-west4".to_string()])
        );
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.auth, AuthMethod::Gcloud);
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn test_flags_override_file() {
        let file: FileConfig = serde_yaml::from_str(
            "project: from-file\nmax_age_hours: 48\nregions: [us-east1]\n",
        )
        .unwrap();
        let args = ConfigArgs {
            project: Some("from-flag".to_string()),
            max_age_hours: Some(12),
            regions: vec!["asia-east1".to_string()],
            only: vec!["redis".to_string()],
            ..ConfigArgs::default()
        };

        let config = SweeperConfig::merge(&args, file).unwrap();
        assert_eq!(config.project.as_deref(), Some("from-flag"));
        assert_eq!(config.max_age, chrono::Duration::hours(12));
        assert_eq!(config.regions, Some(vec!["asia-east1".to_string()]));
        assert_eq!(config.types, vec![ResourceType::RedisInstance]);
    }

    #[test]
    #[serial]
    fn test_project_env_fallback() {
        let config = temp_env::with_var(PROJECT_FALLBACK_ENV, Some("ambient-project"), || {
            SweeperConfig::merge(&ConfigArgs::default(), FileConfig::default()).unwrap()
        });
        assert_eq!(config.project.as_deref(), Some("ambient-project"));
    }

    #[test]
    fn test_invalid_values() {
        let args = ConfigArgs {
            max_age_hours: Some(0),
            ..ConfigArgs::default()
        };
        assert!(matches!(
            SweeperConfig::merge(&args, FileConfig::default()),
            Err(ConfigError::Invalid(_))
        ));

        let args = ConfigArgs {
            concurrency: Some(0),
            ..ConfigArgs::default()
        };
        assert!(SweeperConfig::merge(&args, FileConfig::default()).is_err());

        let args = ConfigArgs {
            only: vec!["bucket".to_string()],
            ..ConfigArgs::default()
        };
        assert!(SweeperConfig::merge(&args, FileConfig::default()).is_err());

        let args = ConfigArgs {
            label_key: Some("  ".to_string()),
            ..ConfigArgs::default()
        };
        assert!(SweeperConfig::merge(&args, FileConfig::default()).is_err());
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "max_age: 3\n").unwrap();

        assert!(matches!(
            FileConfig::from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/sweeper.yaml")),
            ..ConfigArgs::default()
        };
        assert!(matches!(
            SweeperConfig::load(&args),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_policy_from_config() {
        let args = ConfigArgs {
            max_age_hours: Some(6),
            label_value: Some("true".to_string()),
            dry_run: true,
            ..ConfigArgs::default()
        };
        let config = SweeperConfig::merge(&args, FileConfig::default()).unwrap();
        let policy = config.policy();
        assert_eq!(policy.max_age, chrono::Duration::hours(6));
        assert_eq!(policy.exemption_value.as_deref(), Some("true"));
        assert!(policy.dry_run);
    }

    #[test]
    fn test_max_age_out_of_range() {
        for hours in [u64::MAX, i64::MAX as u64 + 1, 9_000_000_000_000_000] {
            let args = ConfigArgs {
                max_age_hours: Some(hours),
                ..ConfigArgs::default()
            };
            assert!(
                matches!(
                    SweeperConfig::merge(&args, FileConfig::default()),
                    Err(ConfigError::Invalid(_))
                ),
                "{} hours accepted",
                hours
            );
        }
    }

    #[test]
    fn test_large_max_age_keeps_young_resources() {
        let args = ConfigArgs {
            max_age_hours: Some(24 * 365 * 100),
            ..ConfigArgs::default()
        };
        let config = SweeperConfig::merge(&args, FileConfig::default()).unwrap();
        let now = chrono::Utc::now();

        assert!(config.max_age > chrono::Duration::zero());
        assert!(!config.policy().is_expired(now - chrono::Duration::minutes(1), now));
    }

    #[test]
    fn test_list_timeout() {
        let config = SweeperConfig::merge(&ConfigArgs::default(), FileConfig::default()).unwrap();
        assert_eq!(config.list_timeout, std::time::Duration::from_secs(1200));
        assert_eq!(config.coordinator_config().list_timeout, config.list_timeout);

        let args = ConfigArgs {
            timeout_secs: Some(120),
            list_timeout_secs: Some(60),
            ..ConfigArgs::default()
        };
        assert!(matches!(
            SweeperConfig::merge(&args, FileConfig::default()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_file_dry_run_and_log_format() {
        let file: FileConfig =
            serde_yaml::from_str("dry_run: true\nlog_format: json\nlist_timeout_secs: 900\n")
                .unwrap();
        let config = SweeperConfig::merge(&ConfigArgs::default(), file).unwrap();
        assert!(config.dry_run);
        assert!(config.policy().dry_run);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.list_timeout, std::time::Duration::from_secs(900));

        let file: FileConfig = serde_yaml::from_str("log_format: json\n").unwrap();
        let args = ConfigArgs {
            log_format: Some(LogFormat::Text),
            ..ConfigArgs::default()
        };
        let config = SweeperConfig::merge(&args, file).unwrap();
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.dry_run);
    }
}
