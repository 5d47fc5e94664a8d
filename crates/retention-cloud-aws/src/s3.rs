//! Amazon S3 implementation of [`BucketInspector`]

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::DateTimeFormat;
use aws_sdk_s3::types as s3;
use retention_cloud::{
    BucketInspector, CloudError, Expiration, LifecycleRule, ResourcePolicy, Result, Tag, TagSet,
};

const ACCESS_DENIED: &str = "AccessDenied";
const NO_SUCH_BUCKET: &str = "NoSuchBucket";
const NO_SUCH_LIFECYCLE_CONFIGURATION: &str = "NoSuchLifecycleConfiguration";
const NO_SUCH_TAG_SET: &str = "NoSuchTagSet";

/// Reads lifecycle and tagging state of S3 buckets
pub struct S3Inspector {
    client: Client,
    region: String,
}

impl S3Inspector {
    /// Build a client for `region` from the default credential chain.
    ///
    /// SDK-level retries are disabled; wrap the inspector in a
    /// [`retention_cloud::ResilientInspector`] to retry.
    pub async fn from_region(region: impl Into<String>) -> Self {
        let region = region.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        tracing::debug!("Loaded AWS config for region {}", region);
        Self {
            client: Client::new(&config),
            region,
        }
    }

    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl BucketInspector for S3Inspector {
    async fn lifecycle_policy(&self, bucket: &str) -> Result<ResourcePolicy> {
        tracing::debug!("GetBucketLifecycleConfiguration {}", bucket);

        match self
            .client
            .get_bucket_lifecycle_configuration()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(output) => Ok(ResourcePolicy::new(
                output.rules().iter().map(convert_rule).collect(),
            )),
            Err(err) => {
                let (code, message) = describe(&err);
                if code.as_deref() == Some(NO_SUCH_LIFECYCLE_CONFIGURATION) {
                    tracing::debug!("Bucket {} has no lifecycle configuration", bucket);
                    return Ok(ResourcePolicy::default());
                }
                Err(classify(bucket, code.as_deref(), message))
            }
        }
    }

    async fn tags(&self, bucket: &str) -> Result<TagSet> {
        tracing::debug!("GetBucketTagging {}", bucket);

        match self.client.get_bucket_tagging().bucket(bucket).send().await {
            Ok(output) => Ok(output.tag_set().iter().map(convert_tag).collect()),
            Err(err) => {
                let (code, message) = describe(&err);
                if code.as_deref() == Some(NO_SUCH_TAG_SET) {
                    tracing::debug!("Bucket {} has no tags", bucket);
                    return Ok(TagSet::default());
                }
                Err(classify(bucket, code.as_deref(), message))
            }
        }
    }
}

/// Error code (for service errors) and a full message with the source chain
fn describe<E, R>(err: &SdkError<E, R>) -> (Option<String>, String)
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    (code, DisplayErrorContext(err).to_string())
}

/// Map an S3 error code onto the harness error taxonomy
fn classify(bucket: &str, code: Option<&str>, message: String) -> CloudError {
    match code {
        Some(ACCESS_DENIED) => CloudError::AccessDenied(message),
        Some(NO_SUCH_BUCKET) => CloudError::ResourceNotFound(bucket.to_string()),
        Some(code) => CloudError::api(code, message),
        // Dispatch failures, timeouts and unparseable responses carry no code
        None => CloudError::api("Unclassified", message),
    }
}

fn convert_rule(rule: &s3::LifecycleRule) -> LifecycleRule {
    LifecycleRule {
        id: rule.id().map(str::to_string),
        expiration: rule.expiration().map(|e| Expiration {
            days: e.days(),
            date: e.date().and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
            expired_object_delete_marker: e.expired_object_delete_marker(),
        }),
    }
}

fn convert_tag(tag: &s3::Tag) -> Tag {
    Tag::new(tag.key(), tag.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_codes() {
        assert!(classify("b", Some("AccessDenied"), "denied".into()).is_access_denied());
        assert!(matches!(
            classify("b", Some("NoSuchBucket"), "gone".into()),
            CloudError::ResourceNotFound(name) if name == "b"
        ));
        assert!(matches!(
            classify("b", Some("SlowDown"), "throttled".into()),
            CloudError::Api { code, .. } if code == "SlowDown"
        ));
        assert!(matches!(
            classify("b", None, "dispatch failure".into()),
            CloudError::Api { code, .. } if code == "Unclassified"
        ));
    }

    #[test]
    fn test_convert_rule_with_days() {
        let rule = s3::LifecycleRule::builder()
            .id("Expiration days")
            .status(s3::ExpirationStatus::Enabled)
            .expiration(s3::LifecycleExpiration::builder().days(366).build())
            .build()
            .unwrap();

        let converted = convert_rule(&rule);
        assert_eq!(converted.id.as_deref(), Some("Expiration days"));
        assert_eq!(converted.expiration_days(), Some(366));
    }

    #[test]
    fn test_convert_rule_without_expiration() {
        let rule = s3::LifecycleRule::builder()
            .id("Expiration days")
            .status(s3::ExpirationStatus::Enabled)
            .build()
            .unwrap();

        let converted = convert_rule(&rule);
        assert!(converted.expiration.is_none());
    }

    #[test]
    fn test_convert_tag() {
        let tag = s3::Tag::builder()
            .key("data_expiry")
            .value("forever-config-only")
            .build()
            .unwrap();

        assert_eq!(convert_tag(&tag), Tag::new("data_expiry", "forever-config-only"));
    }
}
