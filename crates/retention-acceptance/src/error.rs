//! Acceptance harness error types

use retention_cloud::{CloudError, Expiration};
use std::fmt;
use thiserror::Error;

/// Invalid harness configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("Unknown retention period {0:?}")]
    UnknownCase(String),
}

/// A bucket whose state does not match the expected retention case.
///
/// Verification stops at the first of these.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Lifecycle rule {rule_id:?} not found")]
    MissingRule { rule_id: String },

    #[error("Expected expiration after {expected} days, found {actual}")]
    ExpirationMismatch { expected: i32, actual: i32 },

    #[error("Expected expiration after {expected} days, rule has no expiration days")]
    MissingExpiration { expected: i32 },

    #[error("Expected no expiration, found {found:?}")]
    UnexpectedExpiration { found: Expiration },

    #[error("Tag {key:?} not found")]
    MissingTag { key: String },

    #[error("Tag {key:?} expected {expected:?}, found {actual:?}")]
    TagMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("Could not read bucket state: {0}")]
    Cloud(#[from] CloudError),
}

/// Why a single case failed
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("Failed to prepare environment: {0}")]
    Environment(#[source] std::io::Error),

    #[error("Provisioning failed: {0}")]
    Provision(#[source] CloudError),

    #[error("Provisioned module did not identify its bucket: {0}")]
    Output(#[source] CloudError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("Run deadline exceeded before the case was {0}")]
    DeadlineExceeded(CasePhase),

    #[error("Case aborted: {0}")]
    Aborted(String),
}

/// States a case moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePhase {
    Created,
    Provisioned,
    Verified,
    Failed,
    Destroyed,
}

impl fmt::Display for CasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasePhase::Created => write!(f, "created"),
            CasePhase::Provisioned => write!(f, "provisioned"),
            CasePhase::Verified => write!(f, "verified"),
            CasePhase::Failed => write!(f, "failed"),
            CasePhase::Destroyed => write!(f, "destroyed"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaseError>;
