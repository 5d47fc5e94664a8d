//! Retention acceptance harness
//!
//! Checks that a storage module turns each `data_expiry` label into the right
//! S3 lifecycle expiration and tags the bucket with the label. Every period in
//! the table gets its own uniquely named environment, which is provisioned,
//! inspected and destroyed independently of the others.
//!
//! # Example
//!
//! ```ignore
//! use retention_acceptance::{Driver, HarnessConfig, periods};
//!
//! let config = HarnessConfig::from_env()?;
//! let driver = Driver::from_config(config).await?;
//! let report = driver.run(&periods::all_cases()).await;
//! assert!(report.is_success(), "{}", report.summary());
//! ```

pub mod config;
pub mod contract;
pub mod driver;
pub mod environment;
pub mod error;
pub mod orchestrator;
pub mod periods;
pub mod report;
pub mod verify;

pub use config::HarnessConfig;
pub use driver::Driver;
pub use environment::{Environment, IdProvider, RandomIdProvider, SequenceIdProvider};
pub use error::{CaseError, CasePhase, ConfigError, VerifyError};
pub use orchestrator::Orchestrator;
pub use periods::{NO_EXPIRY_CASE, RETENTION_CASES, RetentionCase};
pub use report::{CaseOutcome, CaseReport, RunReport, RunSummary};
pub use verify::{VerifiedState, Verifier};
