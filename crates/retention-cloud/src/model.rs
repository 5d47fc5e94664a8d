//! Bucket state as read back from the control plane
//!
//! Values are fetched fresh for every verification and dropped afterwards.

use serde::{Deserialize, Serialize};

/// Lifecycle configuration of a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePolicy {
    /// Rules in the order the control plane returned them
    pub rules: Vec<LifecycleRule>,
}

impl ResourcePolicy {
    pub fn new(rules: Vec<LifecycleRule>) -> Self {
        Self { rules }
    }

    /// Find a rule by identifier. The first match wins when identifiers repeat.
    pub fn rule_by_id(&self, id: &str) -> Option<&LifecycleRule> {
        self.rules.iter().find(|r| r.id.as_deref() == Some(id))
    }

    /// Number of rules carrying the given identifier
    pub fn count_with_id(&self, id: &str) -> usize {
        self.rules
            .iter()
            .filter(|r| r.id.as_deref() == Some(id))
            .count()
    }
}

/// A single lifecycle rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRule {
    /// Rule identifier (S3 allows rules without one)
    pub id: Option<String>,

    /// Expiration action; `None` means objects never expire under this rule
    pub expiration: Option<Expiration>,
}

impl LifecycleRule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            expiration: None,
        }
    }

    pub fn with_expiration_days(mut self, days: i32) -> Self {
        self.expiration = Some(Expiration {
            days: Some(days),
            ..Default::default()
        });
        self
    }

    pub fn with_expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Day count of the expiration action, if any
    pub fn expiration_days(&self) -> Option<i32> {
        self.expiration.as_ref().and_then(|e| e.days)
    }
}

/// Expiration action of a lifecycle rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expiration {
    pub days: Option<i32>,
    pub date: Option<String>,
    pub expired_object_delete_marker: Option<bool>,
}

/// Tags attached to a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSet {
    pub tags: Vec<Tag>,
}

impl TagSet {
    pub fn new(tags: Vec<Tag>) -> Self {
        Self { tags }
    }

    /// Value of the first tag with this key
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Number of tags carrying the given key
    pub fn count_with_key(&self, key: &str) -> usize {
        self.tags.iter().filter(|t| t.key == key).count()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<T: IntoIterator<Item = Tag>>(iter: T) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

/// Key/value metadata pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
