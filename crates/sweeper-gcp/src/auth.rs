//! Access token sources
//!
//! Credentials are provisioned outside the sweeper; this module only fetches
//! a bearer token from wherever the deployment put one.

use crate::error::{GcpError, Result};
use serde::Deserialize;
use std::process::Stdio;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Environment variable holding a ready-made access token
pub const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// gcloud does not report expiry; its tokens live for an hour
const GCLOUD_TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where to obtain the access token from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Environment variable, then gcloud, then the metadata server
    #[default]
    Auto,
    Env,
    Gcloud,
    Metadata,
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(AuthMethod::Auto),
            "env" => Ok(AuthMethod::Env),
            "gcloud" => Ok(AuthMethod::Gcloud),
            "metadata" => Ok(AuthMethod::Metadata),
            other => Err(format!(
                "unknown auth method: {} (expected auto, env, gcloud or metadata)",
                other
            )),
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Auto => write!(f, "auto"),
            AuthMethod::Env => write!(f, "env"),
            AuthMethod::Gcloud => write!(f, "gcloud"),
            AuthMethod::Metadata => write!(f, "metadata"),
        }
    }
}

#[derive(Debug, Clone)]
enum TokenKind {
    Static(String),
    Gcloud,
    Metadata,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Bearer token provider with caching
#[derive(Debug)]
pub struct TokenSource {
    kind: TokenKind,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Token that never changes (tests, short-lived jobs)
    pub fn from_static(token: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Static(token.into()),
            http: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    /// Pick a token source for the requested method
    pub async fn resolve(method: AuthMethod, http: reqwest::Client) -> Result<Self> {
        let kind = match method {
            AuthMethod::Env => TokenKind::Static(env_token().ok_or_else(|| {
                GcpError::Auth(format!("{} is not set", TOKEN_ENV))
            })?),
            AuthMethod::Gcloud => {
                ensure_gcloud().await?;
                TokenKind::Gcloud
            }
            AuthMethod::Metadata => TokenKind::Metadata,
            AuthMethod::Auto => {
                if let Some(token) = env_token() {
                    TokenKind::Static(token)
                } else if ensure_gcloud().await.is_ok() {
                    TokenKind::Gcloud
                } else {
                    TokenKind::Metadata
                }
            }
        };

        tracing::debug!("Using {} token source", kind.label());
        Ok(Self {
            kind,
            http,
            cache: Mutex::new(None),
        })
    }

    /// Short name of the active source
    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// Current access token, refreshed when close to expiry
    pub async fn token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(ref cached) = *cache {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        let fresh = match &self.kind {
            TokenKind::Static(token) => return Ok(token.clone()),
            TokenKind::Gcloud => gcloud_token().await?,
            TokenKind::Metadata => metadata_token(&self.http).await?,
        };
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }
}

impl TokenKind {
    fn label(&self) -> &'static str {
        match self {
            TokenKind::Static(_) => "environment",
            TokenKind::Gcloud => "gcloud",
            TokenKind::Metadata => "metadata server",
        }
    }
}

fn env_token() -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn ensure_gcloud() -> Result<()> {
    let which = Command::new("which")
        .arg("gcloud")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !which.success() {
        return Err(GcpError::GcloudNotFound);
    }
    Ok(())
}

async fn run_gcloud(args: &[&str]) -> Result<String> {
    tracing::debug!("Running: gcloud {}", args.join(" "));

    let output = Command::new("gcloud")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GcpError::CommandFailed(stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn gcloud_token() -> Result<CachedToken> {
    let value = run_gcloud(&["auth", "print-access-token"]).await?;
    if value.is_empty() {
        return Err(GcpError::Auth("gcloud returned an empty token".to_string()));
    }
    Ok(CachedToken {
        value,
        expires_at: Instant::now() + GCLOUD_TOKEN_TTL,
    })
}

fn metadata_base() -> String {
    let host = std::env::var(METADATA_HOST_ENV).unwrap_or_else(|_| DEFAULT_METADATA_HOST.to_string());
    format!("http://{}/computeMetadata/v1", host)
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

async fn metadata_token(http: &reqwest::Client) -> Result<CachedToken> {
    let url = format!(
        "{}/instance/service-accounts/default/token",
        metadata_base()
    );
    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| GcpError::Auth(format!("metadata server unreachable: {}", e)))?;

    if !response.status().is_success() {
        return Err(GcpError::Auth(format!(
            "metadata server returned {}",
            response.status()
        )));
    }

    let token: MetadataToken = response.json().await?;
    let ttl = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
    Ok(CachedToken {
        value: token.access_token,
        expires_at: Instant::now() + ttl,
    })
}

/// Project the ambient credentials belong to, if one can be found.
///
/// Tries `gcloud config get-value project`, then the metadata server.
pub async fn detect_project_id(http: &reqwest::Client) -> Option<String> {
    if ensure_gcloud().await.is_ok() {
        if let Ok(project) = run_gcloud(&["config", "get-value", "project"]).await {
            if !project.is_empty() && project != "(unset)" {
                return Some(project);
            }
        }
    }

    let url = format!("{}/project/project-id", metadata_base());
    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    response
        .text()
        .await
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}
