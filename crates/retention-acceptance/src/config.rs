//! Harness configuration
//!
//! Values are read from `RETENTION_*` environment variables, falling back to
//! the defaults the acceptance suite has always used. The configuration is
//! immutable once the run starts and is shared by every case.

use crate::error::ConfigError;
use retention_cloud::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "eu-west-2";
pub const DEFAULT_MODULE_ROOT: &str = "..";
pub const DEFAULT_EXAMPLE_DIR: &str = "examples/simple";
pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";
pub const DEFAULT_NAME_PREFIX: &str = "terratest";

/// Settings shared read-only by all cases of a run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Region for the control-plane client and the provisioning engine
    pub region: String,

    /// Directory copied into each case's isolated working copy
    pub module_root: PathBuf,

    /// Root module to apply, relative to `module_root`
    pub example_dir: PathBuf,

    /// Provisioning engine binary
    pub terraform_binary: String,

    /// Prefix of every unique environment name
    pub name_prefix: String,

    /// Overarching deadline for provisioning and verification
    pub run_timeout: Option<Duration>,

    /// Retry policy for control-plane reads
    pub retry_policy: RetryPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            module_root: PathBuf::from(DEFAULT_MODULE_ROOT),
            example_dir: PathBuf::from(DEFAULT_EXAMPLE_DIR),
            terraform_binary: DEFAULT_TERRAFORM_BIN.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            run_timeout: None,
            retry_policy: RetryPolicy::transient_authorization(),
        }
    }
}

impl HarnessConfig {
    /// Create HarnessConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(region) = env_var("RETENTION_AWS_REGION") {
            config.region = region;
        }
        if let Some(root) = env_var("RETENTION_MODULE_ROOT") {
            config.module_root = PathBuf::from(root);
        }
        if let Some(dir) = env_var("RETENTION_EXAMPLE_DIR") {
            config.example_dir = PathBuf::from(dir);
        }
        if let Some(bin) = env_var("RETENTION_TERRAFORM_BIN") {
            config.terraform_binary = bin;
        }
        if let Some(prefix) = env_var("RETENTION_NAME_PREFIX") {
            config.name_prefix = prefix;
        }
        if let Some(secs) = env_var("RETENTION_RUN_TIMEOUT_SECS") {
            let parsed = secs.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                var: "RETENTION_RUN_TIMEOUT_SECS".to_string(),
                value: secs.clone(),
                reason: e.to_string(),
            })?;
            config.run_timeout = Some(Duration::from_secs(parsed));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_module_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.module_root = root.into();
        self
    }

    pub fn with_example_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.example_dir = dir.into();
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Check values that would otherwise only fail once terraform runs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(invalid("RETENTION_AWS_REGION", &self.region, "must not be empty"));
        }

        // The prefix ends up in bucket names
        let prefix_ok = !self.name_prefix.is_empty()
            && self
                .name_prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !prefix_ok {
            return Err(invalid(
                "RETENTION_NAME_PREFIX",
                &self.name_prefix,
                "use lowercase letters, digits and hyphens",
            ));
        }

        if self.example_dir.is_absolute() {
            return Err(invalid(
                "RETENTION_EXAMPLE_DIR",
                &self.example_dir.display().to_string(),
                "must be relative to the module root",
            ));
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn invalid(var: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
