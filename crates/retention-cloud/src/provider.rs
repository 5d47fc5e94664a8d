//! Collaborator traits
//!
//! The harness treats the provisioning engine and the cloud control plane as
//! black boxes. Both are reached only through the traits below so the orchestration
//! and verification logic can run against in-memory fakes.

use crate::error::{CloudError, Result};
use crate::model::{ResourcePolicy, TagSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Read access to the bucket state that the module under test provisions
#[async_trait]
pub trait BucketInspector: Send + Sync {
    /// Lifecycle configuration of the bucket
    async fn lifecycle_policy(&self, bucket: &str) -> Result<ResourcePolicy>;

    /// Tags attached to the bucket
    async fn tags(&self, bucket: &str) -> Result<TagSet>;
}

/// Declarative provisioning engine
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Returns the engine name for log output (e.g., "terraform")
    fn name(&self) -> &str;

    /// Create or converge the infrastructure defined in `working_dir`
    async fn apply(
        &self,
        working_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<ProvisionOutputs>;

    /// Remove everything a previous `apply` created in `working_dir`
    async fn destroy(&self, working_dir: &Path, variables: &BTreeMap<String, String>)
    -> Result<()>;
}

/// Output values declared by the provisioned module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionOutputs {
    pub values: HashMap<String, serde_json::Value>,
}

impl ProvisionOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// Get an output that must be a string
    pub fn string(&self, name: &str) -> Result<String> {
        match self.values.get(name) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(CloudError::InvalidConfig(format!(
                "output `{}` is not a string: {}",
                name, other
            ))),
            None => Err(CloudError::OutputMissing(name.to_string())),
        }
    }
}
