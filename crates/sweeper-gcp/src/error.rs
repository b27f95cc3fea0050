//! Google Cloud adapter error types

use sweeper_core::SweepError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcpError {
    #[error("gcloud not found. Please install the Google Cloud SDK or set GOOGLE_OAUTH_ACCESS_TOKEN")]
    GcloudNotFound,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("gcloud command failed: {0}")]
    CommandFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GcpError {
    /// HTTP status of the failed call, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            GcpError::PermissionDenied(_) => Some(403),
            GcpError::NotFound(_) => Some(404),
            GcpError::Api { status, .. } => Some(*status),
            GcpError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-side failure (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }

    /// The service is not offered in the requested location
    pub fn is_unsupported_location(&self) -> bool {
        let message = match self {
            GcpError::Api { status: 400, message } | GcpError::NotFound(message) => message,
            _ => return false,
        };
        let message = message.to_ascii_lowercase();
        message.contains("unexpected location")
            || message.contains("location is not supported")
            || message.contains("unsupported location")
            || message.contains("is not available in")
    }

    /// Failure to obtain credentials
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            GcpError::Auth(_) | GcpError::GcloudNotFound | GcpError::CommandFailed(_)
        )
    }
}

impl From<GcpError> for SweepError {
    fn from(e: GcpError) -> Self {
        match e {
            GcpError::PermissionDenied(msg) => SweepError::PermissionDenied(msg),
            GcpError::NotFound(msg) => SweepError::NotFound(msg),
            GcpError::Json(e) => SweepError::Json(e),
            GcpError::Http(e) if e.is_timeout() => SweepError::Timeout(e.to_string()),
            e if e.is_auth() => SweepError::Configuration(e.to_string()),
            e => SweepError::Api(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_location_detection() {
        let e = GcpError::Api {
            status: 400,
            message: "Unexpected location 'me-central2'".to_string(),
        };
        assert!(e.is_unsupported_location());
        assert!(!e.is_server_error());

        let e = GcpError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        };
        assert!(!e.is_unsupported_location());
        assert!(e.is_server_error());

        let e = GcpError::NotFound("Location asia-south2 is not available in this API".to_string());
        assert!(e.is_unsupported_location());

        let e = GcpError::NotFound("Environment env-1 not found".to_string());
        assert!(!e.is_unsupported_location());
    }

    #[test]
    fn test_conversion_into_sweep_error() {
        let e: SweepError = GcpError::PermissionDenied("no container.clusters.delete".into()).into();
        assert!(matches!(e, SweepError::PermissionDenied(_)));

        let e: SweepError = GcpError::GcloudNotFound.into();
        assert!(matches!(e, SweepError::Configuration(_)));

        let e: SweepError = GcpError::Api {
            status: 500,
            message: "oops".into(),
        }
        .into();
        assert!(matches!(e, SweepError::Api(_)));
    }
}
