//! Per-case and per-run results

use crate::error::{CaseError, CasePhase};
use crate::periods::RetentionCase;
use crate::verify::VerifiedState;
use std::time::Duration;

/// Outcome of verifying one case
#[derive(Debug)]
pub enum CaseOutcome {
    Passed(VerifiedState),
    Failed(CaseError),
}

/// Result of a single case
#[derive(Debug)]
pub struct CaseReport {
    /// Case that was run
    pub case: RetentionCase,

    /// Unique environment name, once one was assigned
    pub environment: Option<String>,

    /// Bucket reported by the module
    pub bucket: Option<String>,

    /// Verification outcome
    pub outcome: CaseOutcome,

    /// Last state the case reached
    pub final_phase: CasePhase,

    /// Destroy failure, reported next to (never instead of) the outcome
    pub teardown_error: Option<String>,

    /// Wall-clock time of the case
    pub duration: Duration,
}

impl CaseReport {
    pub fn new(case: RetentionCase, outcome: CaseOutcome) -> Self {
        let final_phase = match outcome {
            CaseOutcome::Passed(_) => CasePhase::Verified,
            CaseOutcome::Failed(_) => CasePhase::Failed,
        };
        Self {
            case,
            environment: None,
            bucket: None,
            outcome,
            final_phase,
            teardown_error: None,
            duration: Duration::ZERO,
        }
    }

    /// Report for a case that never produced a result of its own
    pub fn aborted(case: RetentionCase, reason: impl Into<String>) -> Self {
        Self::new(case, CaseOutcome::Failed(CaseError::Aborted(reason.into())))
    }

    /// Name the environment the case ran in, so leftovers can be traced
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed(_))
    }

    pub fn error(&self) -> Option<&CaseError> {
        match &self.outcome {
            CaseOutcome::Passed(_) => None,
            CaseOutcome::Failed(e) => Some(e),
        }
    }
}

/// Results of a whole run, in case order
#[derive(Debug, Default)]
pub struct RunReport {
    pub cases: Vec<CaseReport>,

    /// Total execution time
    pub duration: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.cases.iter().all(CaseReport::is_success)
    }

    pub fn passed(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| c.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| !c.is_success())
    }

    pub fn get(&self, label: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.case.period_label == label)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            passed: self.passed().count(),
            failed: self.failed().count(),
            teardown_failures: self
                .cases
                .iter()
                .filter(|c| c.teardown_error.is_some())
                .count(),
        }
    }
}

/// Counts of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub teardown_failures: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)?;
        if self.teardown_failures > 0 {
            write!(f, ", {} teardown failures", self.teardown_failures)?;
        }
        Ok(())
    }
}
