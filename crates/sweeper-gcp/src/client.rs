//! Authenticated REST client for Google Cloud APIs

use crate::auth::TokenSource;
use crate::error::{GcpError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default bound on listing one region or zone, all pages included
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Guard against APIs that keep handing out the same page token
const MAX_PAGES: usize = 1000;

/// Shared client used by every adapter
#[derive(Debug, Clone)]
pub struct GcpClient {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    project_id: String,
    location_timeout: Duration,
}

impl GcpClient {
    pub fn new(project_id: impl Into<String>, http: reqwest::Client, tokens: TokenSource) -> Self {
        Self {
            http,
            tokens: Arc::new(tokens),
            project_id: project_id.into(),
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
        }
    }

    /// Bound on listing a single location; a slower location is reported
    /// as a scope failure while the others are kept
    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        self.location_timeout = timeout;
        self
    }

    pub fn location_timeout(&self) -> Duration {
        self.location_timeout
    }

    /// Build the underlying HTTP client with a request timeout
    pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gcp-sweeper/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// `https://{service}.googleapis.com/{path}`
    pub fn service_url(service: &str, path: &str) -> String {
        format!(
            "https://{}.googleapis.com/{}",
            service,
            path.trim_start_matches('/')
        )
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.tokens.token().await?;
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let token = self.tokens.token().await?;
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Issue a DELETE and return the long-running operation name, if any.
    ///
    /// The operation is not polled.
    pub async fn delete(&self, url: &str) -> Result<Option<String>> {
        let token = self.tokens.token().await?;
        tracing::debug!("DELETE {}", url);

        let response = self.http.delete(url).bearer_auth(token).send().await?;
        let body = check(response).await?.text().await?;
        Ok(operation_name(&body))
    }

    /// Fetch every page of a list endpoint, collecting the `items_key` array
    pub async fn list_all<T: DeserializeOwned>(&self, url: &str, items_key: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let query: Vec<(&str, &str)> = match page_token.as_deref() {
                Some(token) => vec![("pageToken", token)],
                None => Vec::new(),
            };
            let page: serde_json::Value = self.get_json(url, &query).await?;
            let (mut page_items, next) = split_page::<T>(page, items_key)?;
            items.append(&mut page_items);

            match next {
                Some(token) if Some(&token) != page_token.as_ref() => page_token = Some(token),
                _ => return Ok(items),
            }
        }

        Err(GcpError::InvalidResponse(format!(
            "{} returned more than {} pages",
            url, MAX_PAGES
        )))
    }
}

/// Pull `items_key` and `nextPageToken` out of one list page
fn split_page<T: DeserializeOwned>(
    mut page: serde_json::Value,
    items_key: &str,
) -> Result<(Vec<T>, Option<String>)> {
    let next = page
        .get("nextPageToken")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let items = match page.get_mut(items_key).map(serde_json::Value::take) {
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(value) => serde_json::from_value(value)?,
    };
    Ok((items, next))
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body))
}

/// Map a Google error envelope onto [`GcpError`]
pub(crate) fn error_from_body(status: u16, body: &str) -> GcpError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| match e.error.status {
            Some(code) if !code.is_empty() => format!("{}: {}", code, e.error.message),
            _ => e.error.message,
        })
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });

    match status {
        401 => GcpError::Auth(message),
        403 => GcpError::PermissionDenied(message),
        404 => GcpError::NotFound(message),
        _ => GcpError::Api { status, message },
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationRef {
    #[serde(default)]
    name: Option<String>,
}

/// Operation name from an accepted DELETE; the status already means success,
/// so an empty or unexpected body is not an error
fn operation_name(body: &str) -> Option<String> {
    serde_json::from_str::<OperationRef>(body)
        .ok()
        .and_then(|o| o.name)
}
