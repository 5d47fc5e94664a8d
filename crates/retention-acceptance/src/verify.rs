//! Bucket state verification
//!
//! Reads the lifecycle policy and tags of a provisioned bucket and checks them
//! against a [`RetentionCase`]. Assertions run in a fixed order and the first
//! failure ends verification for that case:
//!
//! 1. the `Expiration days` rule exists
//! 2. its day count equals the expected value, or
//! 3. for the no-expiry case, the rule has no expiration at all
//! 4. the `data_expiry` tag exists and equals the period label

use crate::contract::{EXPIRY_RULE_ID, EXPIRY_TAG_KEY};
use crate::error::VerifyError;
use crate::periods::RetentionCase;
use retention_cloud::{BucketInspector, ResourcePolicy, TagSet};
use std::sync::Arc;

/// What the verifier observed on a passing bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedState {
    pub bucket: String,
    pub expiration_days: Option<i32>,
    pub tag_value: String,
}

/// Checks provisioned buckets against the period table
#[derive(Clone)]
pub struct Verifier {
    inspector: Arc<dyn BucketInspector>,
}

impl Verifier {
    pub fn new(inspector: Arc<dyn BucketInspector>) -> Self {
        Self { inspector }
    }

    pub async fn verify(
        &self,
        bucket: &str,
        case: &RetentionCase,
    ) -> Result<VerifiedState, VerifyError> {
        let policy = self.inspector.lifecycle_policy(bucket).await?;
        let expiration_days = check_policy(&policy, case)?;

        let tags = self.inspector.tags(bucket).await?;
        let tag_value = check_tags(&tags, case)?;

        tracing::debug!(
            bucket,
            ?expiration_days,
            tag_value = %tag_value,
            "Bucket state matches {}",
            case
        );

        Ok(VerifiedState {
            bucket: bucket.to_string(),
            expiration_days,
            tag_value,
        })
    }
}

/// Assertions 1–3: returns the verified day count (`None` for no expiry)
pub fn check_policy(
    policy: &ResourcePolicy,
    case: &RetentionCase,
) -> Result<Option<i32>, VerifyError> {
    let rule = policy
        .rule_by_id(EXPIRY_RULE_ID)
        .ok_or_else(|| VerifyError::MissingRule {
            rule_id: EXPIRY_RULE_ID.to_string(),
        })?;

    let duplicates = policy.count_with_id(EXPIRY_RULE_ID);
    if duplicates > 1 {
        tracing::warn!(
            "{} lifecycle rules share the id {:?}; checking the first",
            duplicates,
            EXPIRY_RULE_ID
        );
    }

    match (case.expected_days, &rule.expiration) {
        (Some(expected), Some(expiration)) => match expiration.days {
            Some(actual) if actual == expected => Ok(Some(actual)),
            Some(actual) => Err(VerifyError::ExpirationMismatch { expected, actual }),
            None => Err(VerifyError::MissingExpiration { expected }),
        },
        (Some(expected), None) => Err(VerifyError::MissingExpiration { expected }),
        (None, Some(expiration)) => Err(VerifyError::UnexpectedExpiration {
            found: expiration.clone(),
        }),
        (None, None) => Ok(None),
    }
}

/// Assertion 4: returns the verified tag value
pub fn check_tags(tags: &TagSet, case: &RetentionCase) -> Result<String, VerifyError> {
    let value = tags
        .value_of(EXPIRY_TAG_KEY)
        .ok_or_else(|| VerifyError::MissingTag {
            key: EXPIRY_TAG_KEY.to_string(),
        })?;

    if tags.count_with_key(EXPIRY_TAG_KEY) > 1 {
        tracing::warn!("Tag {:?} appears more than once; checking the first", EXPIRY_TAG_KEY);
    }

    if value != case.period_label {
        return Err(VerifyError::TagMismatch {
            key: EXPIRY_TAG_KEY.to_string(),
            expected: case.period_label.to_string(),
            actual: value.to_string(),
        });
    }

    Ok(value.to_string())
}
