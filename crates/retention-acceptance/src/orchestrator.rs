//! Ephemeral environment orchestration
//!
//! One case walks through
//!
//! ```text
//! Created ──apply──▶ Provisioned ──verify──▶ Verified
//!    │                    │                    │
//!    └──── fail ──────────┴──── fail ─▶ Failed │
//!                                        │     │
//!                                        ▼     ▼
//!                                       Destroyed
//! ```
//!
//! Destroy runs on every path once the environment exists: after a pass, an
//! assertion failure, an apply failure, a missing output, a panic, the run
//! deadline, or cancellation of the caller.
//!
//! The lifecycle of a case runs in its own task. Dropping the future returned
//! by [`Orchestrator::run_case`] signals cancellation to that task, which then
//! skips whatever has not started and still destroys the environment.
//!
//! Neither the deadline nor cancellation interrupts a running apply. A killed
//! apply can leave resources that never reached the local state, and destroy
//! would not see them.

use crate::config::HarnessConfig;
use crate::contract::BUCKET_NAME_OUTPUT;
use crate::environment::{Environment, IdProvider, unique_name};
use crate::error::{CaseError, CasePhase};
use crate::periods::RetentionCase;
use crate::report::{CaseOutcome, CaseReport};
use crate::verify::{VerifiedState, Verifier};
use futures_util::FutureExt;
use retention_cloud::{BucketInspector, Provisioner};
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Drives provision → verify → destroy for single cases
pub struct Orchestrator {
    config: HarnessConfig,
    provisioner: Arc<dyn Provisioner>,
    verifier: Verifier,
    ids: Arc<dyn IdProvider>,
}

impl Orchestrator {
    pub fn new(
        config: HarnessConfig,
        provisioner: Arc<dyn Provisioner>,
        inspector: Arc<dyn BucketInspector>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            config,
            provisioner,
            verifier: Verifier::new(inspector),
            ids,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one case to completion. Never panics on case failure; the outcome
    /// is in the returned report.
    pub async fn run_case(
        self: &Arc<Self>,
        case: RetentionCase,
        deadline: Option<Instant>,
    ) -> CaseReport {
        let started = Instant::now();
        let name = unique_name(&self.config.name_prefix, self.ids.as_ref());

        // Dropped together with this future; the task reads that as cancellation
        let (_cancel, cancelled) = watch::channel(());

        let orchestrator = Arc::clone(self);
        let task_name = name.clone();
        let lifecycle = tokio::spawn(async move {
            orchestrator
                .run_lifecycle(case, task_name, deadline, cancelled)
                .await
        });

        match lifecycle.await {
            Ok(mut report) => {
                report.duration = started.elapsed();
                report
            }
            Err(e) => {
                tracing::error!("[{}] {} did not complete: {}", case, name, e);
                let mut report = CaseReport::aborted(case, e.to_string()).with_environment(name);
                report.duration = started.elapsed();
                report
            }
        }
    }

    async fn run_lifecycle(
        &self,
        case: RetentionCase,
        name: String,
        deadline: Option<Instant>,
        mut cancelled: watch::Receiver<()>,
    ) -> CaseReport {
        let env = match self.create_environment(&name, &case).await {
            Ok(env) => env,
            Err(e) => {
                tracing::error!("[{}] could not prepare {}: {}", case, name, e);
                return CaseReport::new(case, CaseOutcome::Failed(CaseError::Environment(e)))
                    .with_environment(name);
            }
        };
        tracing::info!(
            "[{}] {} {} in {}",
            case,
            CasePhase::Created,
            name,
            env.working_dir().display()
        );

        let mut guard = TeardownGuard::new(name.clone());
        let mut bucket = None;

        let result = AssertUnwindSafe(self.provision_and_verify(
            &env,
            &case,
            deadline,
            &mut cancelled,
            &mut bucket,
        ))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let reason = panic_message(panic.as_ref());
            tracing::error!("[{}] panicked: {}", case, reason);
            Err(CaseError::Aborted(format!("panicked: {}", reason)))
        });

        let outcome = match result {
            Ok(state) => {
                tracing::info!("[{}] {}", case, CasePhase::Verified);
                CaseOutcome::Passed(state)
            }
            Err(e) => {
                tracing::warn!("[{}] {}: {}", case, CasePhase::Failed, e);
                CaseOutcome::Failed(e)
            }
        };

        let teardown_error = self.teardown(&case, &env).await;
        guard.disarm();

        let mut report = CaseReport::new(case, outcome).with_environment(name);
        report.bucket = bucket;
        report.final_phase = CasePhase::Destroyed;
        report.teardown_error = teardown_error;
        report
    }

    async fn create_environment(&self, name: &str, case: &RetentionCase) -> io::Result<Environment> {
        let name = name.to_string();
        let module_root = self.config.module_root.clone();
        let example_dir = self.config.example_dir.clone();
        let variables = case.variables();

        tokio::task::spawn_blocking(move || {
            Environment::create(&name, &module_root, &example_dir, variables)
        })
        .await
        .map_err(io::Error::other)?
    }

    async fn provision_and_verify(
        &self,
        env: &Environment,
        case: &RetentionCase,
        deadline: Option<Instant>,
        cancelled: &mut watch::Receiver<()>,
        bucket: &mut Option<String>,
    ) -> Result<VerifiedState, CaseError> {
        check_interrupted(deadline, cancelled, CasePhase::Provisioned)?;

        // Runs to completion even past the deadline
        let outputs = self
            .provisioner
            .apply(env.working_dir(), env.variables())
            .await
            .map_err(CaseError::Provision)?;

        let name = outputs
            .string(BUCKET_NAME_OUTPUT)
            .map_err(CaseError::Output)?;
        tracing::info!("[{}] {} bucket {}", case, CasePhase::Provisioned, name);
        *bucket = Some(name.clone());

        check_interrupted(deadline, cancelled, CasePhase::Verified)?;

        tokio::select! {
            result = self.verifier.verify(&name, case) => Ok(result?),
            _ = wait_for_deadline(deadline) => Err(CaseError::DeadlineExceeded(CasePhase::Verified)),
            _ = wait_for_cancel(cancelled) => Err(cancellation(CasePhase::Verified)),
        }
    }

    /// Destroy the environment; failures are logged and returned, never raised
    async fn teardown(&self, case: &RetentionCase, env: &Environment) -> Option<String> {
        match self
            .provisioner
            .destroy(env.working_dir(), env.variables())
            .await
        {
            Ok(()) => {
                tracing::info!("[{}] {} {}", case, CasePhase::Destroyed, env.unique_name());
                None
            }
            Err(e) => {
                tracing::error!(
                    "[{}] {} destroy failed, resources named {} may need manual cleanup: {}",
                    case,
                    self.provisioner.name(),
                    env.unique_name(),
                    e
                );
                Some(e.to_string())
            }
        }
    }
}

/// Fails with the phase the case would have reached next
fn check_interrupted(
    deadline: Option<Instant>,
    cancelled: &watch::Receiver<()>,
    next: CasePhase,
) -> Result<(), CaseError> {
    if cancelled.has_changed().is_err() {
        return Err(cancellation(next));
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(CaseError::DeadlineExceeded(next));
    }
    Ok(())
}

fn cancellation(next: CasePhase) -> CaseError {
    CaseError::Aborted(format!("run cancelled before the case was {}", next))
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Resolves once the sending side is gone
async fn wait_for_cancel(cancelled: &mut watch::Receiver<()>) {
    while cancelled.changed().await.is_ok() {}
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Flags environments whose lifecycle task was dropped between creation and
/// teardown (the runtime shut down underneath it).
struct TeardownGuard {
    environment: String,
    armed: bool,
}

impl TeardownGuard {
    fn new(environment: String) -> Self {
        Self {
            environment,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!(
                "Environment {} was dropped before teardown; resources named after it may have leaked",
                self.environment
            );
        }
    }
}
