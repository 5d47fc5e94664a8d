//! terraform provisioner error types

use retention_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerraformError {
    #[error("{0} not found. Please install terraform (or set RETENTION_TERRAFORM_BIN)")]
    BinaryNotFound(String),

    #[error("terraform {subcommand} failed: {stderr}")]
    CommandFailed { subcommand: String, stderr: String },

    #[error("Invalid retryable error pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<TerraformError> for CloudError {
    fn from(err: TerraformError) -> Self {
        match err {
            TerraformError::CommandFailed { subcommand, stderr } => CloudError::CommandFailed {
                command: format!("terraform {}", subcommand),
                stderr,
            },
            TerraformError::JsonError(e) => CloudError::Json(e),
            TerraformError::IoError(e) => CloudError::Io(e),
            other @ (TerraformError::BinaryNotFound(_) | TerraformError::InvalidPattern(_)) => {
                CloudError::InvalidConfig(other.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TerraformError>;
