use async_trait::async_trait;
use retention_cloud::{
    BucketInspector, CloudError, LifecycleRule, ProvisionOutputs, Provisioner, ResourcePolicy,
    Tag, TagSet,
};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// A minimal module tree laid out like the real one
pub struct TestModule {
    pub root: TempDir,
}

impl TestModule {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let example = root.path().join("examples/simple");
        fs::create_dir_all(&example).unwrap();
        fs::write(root.path().join("main.tf"), "# storage module").unwrap();
        fs::write(example.join("main.tf"), "module \"storage\" { source = \"../..\" }").unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

/// Ways the simulated module can misbehave for one label
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Fault {
    WrongDays(i32),
    WrongTag(&'static str),
    FailApply,
    Panic,
    /// Apply takes this long before creating the bucket
    SlowApply(Duration),
    /// Reads of the bucket never answer
    StallVerify,
}

#[derive(Debug, Clone)]
struct Bucket {
    label: String,
    policy: ResourcePolicy,
    tags: TagSet,
}

/// Simulates both the provisioning engine and the storage control plane.
///
/// Each apply creates a bucket named after the `test_name` variable whose
/// lifecycle rule and tags follow the `data_expiry` label.
#[derive(Default)]
pub struct InMemoryCloud {
    buckets: Mutex<HashMap<String, Bucket>>,
    applied: Mutex<Vec<String>>,
    destroyed: Mutex<Vec<String>>,
    faults: HashMap<&'static str, Fault>,
}

#[allow(dead_code)]
impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(mut self, label: &'static str, fault: Fault) -> Self {
        self.faults.insert(label, fault);
        self
    }

    /// Names of environments applied so far
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    /// Names of environments destroyed so far
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn live_buckets(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }
}

/// The label conversion the storage module performs
fn module_days(label: &str) -> Option<i32> {
    match label {
        "1-day" => Some(1),
        "1-week" => Some(7),
        "1-month" => Some(31),
        "90-days" => Some(90),
        "6-months" => Some(183),
        "1-year" => Some(366),
        "18-months" => Some(549),
        "7-years" => Some(2557),
        "10-years" => Some(3653),
        _ => None,
    }
}

#[async_trait]
impl Provisioner for InMemoryCloud {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn apply(
        &self,
        working_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> retention_cloud::Result<ProvisionOutputs> {
        assert!(working_dir.join("main.tf").exists());
        let name = variables["test_name"].clone();
        let label = variables["data_expiry"].clone();
        self.applied.lock().unwrap().push(name.clone());

        let fault = self.faults.get(label.as_str()).cloned();
        let mut days = module_days(&label);
        let mut tag = label.clone();
        match fault {
            Some(Fault::FailApply) => {
                return Err(CloudError::CommandFailed {
                    command: "terraform apply".into(),
                    stderr: format!("Error: creating S3 Bucket ({}-data): BucketAlreadyExists", name),
                });
            }
            Some(Fault::Panic) => panic!("provider crashed while applying {}", label),
            Some(Fault::SlowApply(delay)) => tokio::time::sleep(delay).await,
            Some(Fault::WrongDays(d)) => days = Some(d),
            Some(Fault::WrongTag(t)) => tag = t.to_string(),
            Some(Fault::StallVerify) | None => {}
        }

        let rule = match days {
            Some(d) => LifecycleRule::new("Expiration days").with_expiration_days(d),
            None => LifecycleRule::new("Expiration days"),
        };
        let bucket = format!("{}-data", name);
        self.buckets.lock().unwrap().insert(
            bucket.clone(),
            Bucket {
                label: label.clone(),
                policy: ResourcePolicy::new(vec![rule]),
                tags: TagSet::new(vec![Tag::new("Name", &bucket), Tag::new("data_expiry", tag)]),
            },
        );

        Ok(ProvisionOutputs::new().with_value("bucket_name", serde_json::json!(bucket)))
    }

    async fn destroy(
        &self,
        _working_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> retention_cloud::Result<()> {
        let name = variables["test_name"].clone();
        self.buckets.lock().unwrap().remove(&format!("{}-data", name));
        self.destroyed.lock().unwrap().push(name);
        Ok(())
    }
}

impl InMemoryCloud {
    async fn read(&self, bucket: &str) -> retention_cloud::Result<Bucket> {
        let found = self.buckets.lock().unwrap().get(bucket).cloned();
        let found = found.ok_or_else(|| CloudError::ResourceNotFound(bucket.to_string()))?;
        if matches!(self.faults.get(found.label.as_str()), Some(Fault::StallVerify)) {
            std::future::pending::<()>().await;
        }
        Ok(found)
    }
}

#[async_trait]
impl BucketInspector for InMemoryCloud {
    async fn lifecycle_policy(&self, bucket: &str) -> retention_cloud::Result<ResourcePolicy> {
        Ok(self.read(bucket).await?.policy)
    }

    async fn tags(&self, bucket: &str) -> retention_cloud::Result<TagSet> {
        Ok(self.read(bucket).await?.tags)
    }
}
