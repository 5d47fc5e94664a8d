//! terraform provisioner for the retention acceptance harness
//!
//! This crate implements the `Provisioner` trait by driving the terraform CLI.
//!
//! # Requirements
//!
//! - `terraform` (or a compatible binary such as `tofu`) must be on `PATH`
//! - Provider credentials are taken from the environment of the calling process
//!
//! # Example
//!
//! ```ignore
//! use retention_terraform::Terraform;
//! use retention_cloud::Provisioner;
//!
//! let tf = Terraform::new("terraform")?.with_env("AWS_REGION", "eu-west-2");
//!
//! let outputs = tf.apply(dir.path(), &vars).await?;
//! let bucket = outputs.string("bucket_name")?;
//! tf.destroy(dir.path(), &vars).await?;
//! ```

pub mod error;
pub mod provisioner;
pub mod terraform;

pub use error::{Result, TerraformError};
pub use terraform::{DEFAULT_RETRYABLE_ERRORS, OutputEntry, Terraform, parse_outputs};
