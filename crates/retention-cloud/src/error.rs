//! Cloud collaborator error types

use thiserror::Error;

/// Errors raised by the provisioning engine and the cloud control plane
#[derive(Error, Debug)]
pub enum CloudError {
    /// Authorization was denied. Freshly created roles are not honoured by every
    /// endpoint straight away, so this is the one transient class the harness retries.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("API error [{code}]: {message}")]
    Api { code: String, message: String },

    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Output `{0}` was not produced by the provisioning run")]
    OutputMissing(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<CloudError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Authorization-denied classifier used by the default retry policy
    pub fn is_access_denied(&self) -> bool {
        matches!(self, CloudError::AccessDenied(_))
    }

    /// Builds an [`CloudError::Api`] from a service error code and message
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_classification() {
        assert!(CloudError::AccessDenied("role not ready".into()).is_access_denied());
        assert!(!CloudError::api("NoSuchBucket", "gone").is_access_denied());
        assert!(!CloudError::ResourceNotFound("bucket".into()).is_access_denied());
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let err = CloudError::RetriesExhausted {
            attempts: 7,
            last: Box::new(CloudError::AccessDenied("still denied".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("7 attempts"));
        assert!(msg.contains("still denied"));
    }
}
