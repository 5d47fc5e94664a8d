//! Retention period table
//!
//! Expected day counts are written out here independently of the module under
//! test, so a change in the module's own label→days conversion shows up as a
//! failing case instead of being confirmed by construction.

use crate::contract::DATA_EXPIRY_VAR;
use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;

/// One row of the period table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetentionCase {
    /// Value passed as `data_expiry`
    pub period_label: &'static str,

    /// Expected expiration in days; `None` means the rule must not expire objects
    pub expected_days: Option<i32>,
}

impl RetentionCase {
    pub const fn expiring(period_label: &'static str, days: i32) -> Self {
        Self {
            period_label,
            expected_days: Some(days),
        }
    }

    pub const fn never_expiring(period_label: &'static str) -> Self {
        Self {
            period_label,
            expected_days: None,
        }
    }

    pub fn expects_expiration(&self) -> bool {
        self.expected_days.is_some()
    }

    /// Case-specific input variables for the module
    pub fn variables(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(DATA_EXPIRY_VAR.to_string(), self.period_label.to_string())])
    }
}

impl fmt::Display for RetentionCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data_expiry {}", self.period_label)
    }
}

/// Labels that map to an expiration
pub const RETENTION_CASES: [RetentionCase; 9] = [
    RetentionCase::expiring("1-day", 1),
    RetentionCase::expiring("1-week", 7),
    RetentionCase::expiring("1-month", 31),
    RetentionCase::expiring("90-days", 90),
    RetentionCase::expiring("6-months", 183),
    RetentionCase::expiring("1-year", 366),
    RetentionCase::expiring("18-months", 549),
    RetentionCase::expiring("7-years", 2557),
    RetentionCase::expiring("10-years", 3653),
];

/// Label for buckets whose objects are kept forever
pub const NO_EXPIRY_CASE: RetentionCase = RetentionCase::never_expiring("forever-config-only");

/// Every table row followed by the no-expiry case
pub fn all_cases() -> Vec<RetentionCase> {
    RETENTION_CASES
        .iter()
        .copied()
        .chain(std::iter::once(NO_EXPIRY_CASE))
        .collect()
}

/// Find a case by its exact label
pub fn lookup(label: &str) -> Option<RetentionCase> {
    all_cases().into_iter().find(|c| c.period_label == label)
}

/// Cases for the given labels in table order; every case when `labels` is empty
pub fn select(labels: &[String]) -> Result<Vec<RetentionCase>, ConfigError> {
    if let Some(unknown) = labels.iter().find(|l| lookup(l).is_none()) {
        return Err(ConfigError::UnknownCase(unknown.clone()));
    }

    Ok(all_cases()
        .into_iter()
        .filter(|c| labels.is_empty() || labels.iter().any(|l| l == c.period_label))
        .collect())
}
