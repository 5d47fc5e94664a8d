//! [`Provisioner`] implementation backed by the terraform CLI

use crate::terraform::Terraform;
use async_trait::async_trait;
use retention_cloud::{CloudError, ProvisionOutputs, Provisioner};
use std::collections::BTreeMap;
use std::path::Path;

#[async_trait]
impl Provisioner for Terraform {
    fn name(&self) -> &str {
        "terraform"
    }

    async fn apply(
        &self,
        working_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> retention_cloud::Result<ProvisionOutputs> {
        tracing::info!("terraform apply in {}", working_dir.display());
        self.init_and_apply(working_dir, variables)
            .await
            .map_err(CloudError::from)?;
        Ok(self.output(working_dir).await?)
    }

    async fn destroy(
        &self,
        working_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> retention_cloud::Result<()> {
        tracing::info!("terraform destroy in {}", working_dir.display());
        Terraform::destroy(self, working_dir, variables).await?;
        Ok(())
    }
}
