//! Retention acceptance: cloud collaborators
//!
//! This crate holds the pieces shared by every part of the acceptance harness:
//! the bucket state model, the traits through which the provisioning engine and the
//! cloud control plane are reached, and the retry policy used for control-plane reads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              retention-acceptance                │
//! │     (period table, orchestrator, verifier)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                retention-cloud                   │
//! │  ┌──────────────────┐  ┌──────────────────┐     │
//! │  │ trait Provisioner│  │trait BucketInspec│     │
//! │  └──────────────────┘  └──────────────────┘     │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │ Bucket model │  │ RetryPolicy/Resilient│     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │   terraform   │ │    aws s3     │
//! │  provisioner  │ │   inspector   │
//! └───────────────┘ └───────────────┘
//! ```

pub mod error;
pub mod model;
pub mod provider;
pub mod retry;

// Re-exports
pub use error::{CloudError, Result};
pub use model::{Expiration, LifecycleRule, ResourcePolicy, Tag, TagSet};
pub use provider::{BucketInspector, ProvisionOutputs, Provisioner};
pub use retry::{ResilientInspector, RetryPolicy, RetryPredicate};
