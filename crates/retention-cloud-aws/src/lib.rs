//! AWS control-plane reads for the retention acceptance harness
//!
//! # Requirements
//!
//! - AWS credentials resolvable by the default provider chain
//!   (environment, shared profile, SSO, instance role...)
//!
//! # Example
//!
//! ```ignore
//! use retention_cloud::{BucketInspector, ResilientInspector, RetryPolicy};
//! use retention_cloud_aws::S3Inspector;
//!
//! let s3 = S3Inspector::from_region("eu-west-2").await;
//! let inspector = ResilientInspector::new(s3, RetryPolicy::transient_authorization());
//!
//! let policy = inspector.lifecycle_policy("terratest-abc123").await?;
//! ```

pub mod s3;

pub use s3::S3Inspector;
