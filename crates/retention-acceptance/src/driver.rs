//! Case driver
//!
//! Runs every case as its own task. Cases share only the immutable
//! configuration and collaborators held by the [`Orchestrator`]. A case that
//! fails, panics or is cancelled never affects its siblings.

use crate::config::HarnessConfig;
use crate::environment::RandomIdProvider;
use crate::orchestrator::Orchestrator;
use crate::periods::RetentionCase;
use crate::report::{CaseReport, RunReport};
use retention_cloud::{CloudError, ResilientInspector};
use retention_cloud_aws::S3Inspector;
use retention_terraform::Terraform;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Launches cases concurrently and collects their reports
pub struct Driver {
    orchestrator: Arc<Orchestrator>,
}

impl Driver {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wire the real collaborators: terraform for provisioning and S3 behind
    /// the configured retry policy for verification.
    pub async fn from_config(config: HarnessConfig) -> Result<Self, CloudError> {
        let terraform = Terraform::new(config.terraform_binary.clone())?
            .with_env("AWS_REGION", config.region.clone())
            .with_env("AWS_DEFAULT_REGION", config.region.clone());

        let s3 = S3Inspector::from_region(config.region.clone()).await;
        let inspector = ResilientInspector::new(s3, config.retry_policy);

        Ok(Self::new(Orchestrator::new(
            config,
            Arc::new(terraform),
            Arc::new(inspector),
            Arc::new(RandomIdProvider::default()),
        )))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run all cases concurrently. Reports come back in the order of `cases`.
    pub async fn run(&self, cases: &[RetentionCase]) -> RunReport {
        let started = Instant::now();
        let deadline = self
            .orchestrator
            .config()
            .run_timeout
            .map(|timeout| started + timeout);

        tracing::info!("Running {} retention cases", cases.len());

        let mut tasks = JoinSet::new();
        for (index, case) in cases.iter().copied().enumerate() {
            let orchestrator = Arc::clone(&self.orchestrator);
            tasks.spawn(async move { (index, orchestrator.run_case(case, deadline).await) });
        }

        let mut slots: Vec<Option<CaseReport>> = cases.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(e) => tracing::error!("Case task did not complete: {}", e),
            }
        }

        let cases = slots
            .into_iter()
            .zip(cases)
            .map(|(slot, case)| {
                slot.unwrap_or_else(|| CaseReport::aborted(*case, "task did not complete"))
            })
            .collect();

        let report = RunReport {
            cases,
            duration: started.elapsed(),
        };
        tracing::info!("Run finished: {}", report.summary());
        report
    }
}
