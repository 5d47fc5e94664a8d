//! terraform CLI wrapper
//!
//! Wraps the terraform commands the acceptance harness needs:
//! init, apply, output and destroy.

use crate::error::{Result, TerraformError};
use regex::Regex;
use retention_cloud::ProvisionOutputs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;

/// terraform failures known to be transient (provider downloads, plugin start-up,
/// flaky network). Commands failing with one of these are re-run.
pub const DEFAULT_RETRYABLE_ERRORS: &[&str] = &[
    r".*read: connection reset by peer.*",
    r".*transport is closing.*",
    r"Failed to load state.*tcp.*timeout.*",
    r"Failed to load backend.*TLS handshake timeout",
    r"Error installing provider.*TLS handshake timeout",
    r"Error installing provider.*tcp.*timeout",
    r"Error installing provider.*tcp.*connection reset by peer",
    r"Error configuring the backend.*TLS handshake timeout",
    r"Failed to query available provider packages",
    r"Client\.Timeout exceeded while awaiting headers",
    r"timeout while waiting for plugin to start",
    r"Could not download module.*The requested URL returned error: 429",
    r"429 Too Many Requests",
];

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIME_BETWEEN_RETRIES: Duration = Duration::from_secs(5);

/// terraform CLI wrapper
pub struct Terraform {
    binary: String,
    env: Vec<(String, String)>,
    retryable_errors: Vec<Regex>,
    max_retries: u32,
    time_between_retries: Duration,
}

impl Terraform {
    /// Create a wrapper around `binary` with the default retryable-error set
    pub fn new(binary: impl Into<String>) -> Result<Self> {
        Ok(Self {
            binary: binary.into(),
            env: Vec::new(),
            retryable_errors: compile(DEFAULT_RETRYABLE_ERRORS)?,
            max_retries: DEFAULT_MAX_RETRIES,
            time_between_retries: DEFAULT_TIME_BETWEEN_RETRIES,
        })
    }

    /// Environment variable passed to every terraform invocation
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_retryable_errors(mut self, patterns: &[&str]) -> Result<Self> {
        self.retryable_errors = compile(patterns)?;
        Ok(self)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_time_between_retries(mut self, delay: Duration) -> Self {
        self.time_between_retries = delay;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Whether terraform output matches one of the retryable error patterns
    pub fn is_retryable(&self, output: &str) -> bool {
        self.retryable_errors.iter().any(|re| re.is_match(output))
    }

    /// Run a terraform subcommand once and return stdout
    async fn run_command(&self, working_dir: &Path, args: &[String]) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(working_dir);
        cmd.args(args);
        cmd.env("TF_IN_AUTOMATION", "1");
        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Last resort for runtime shutdown; the orchestrator never drops a running apply
        cmd.kill_on_drop(true);

        tracing::debug!(
            "Running: {} {} (in {})",
            self.binary,
            args.join(" "),
            working_dir.display()
        );

        let output = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TerraformError::BinaryNotFound(self.binary.clone()),
            _ => TerraformError::IoError(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(TerraformError::CommandFailed {
                subcommand: args.first().cloned().unwrap_or_default(),
                stderr: format!("{}{}", stderr.trim_end(), tail(&stdout)),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a subcommand, re-running it while it fails with a known transient error
    async fn run_with_retries(&self, working_dir: &Path, args: &[String]) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.run_command(working_dir, args).await {
                Err(TerraformError::CommandFailed { subcommand, stderr })
                    if attempt < self.max_retries && self.is_retryable(&stderr) =>
                {
                    attempt += 1;
                    tracing::warn!(
                        "terraform {} hit a retryable error (retry {}/{}): {}",
                        subcommand,
                        attempt,
                        self.max_retries,
                        stderr.lines().last().unwrap_or_default()
                    );
                    sleep(self.time_between_retries).await;
                }
                other => return other,
            }
        }
    }

    /// terraform init
    pub async fn init(&self, working_dir: &Path) -> Result<()> {
        let args = to_args(&["init", "-input=false", "-no-color"]);
        self.run_with_retries(working_dir, &args).await?;
        Ok(())
    }

    /// terraform init + apply
    pub async fn init_and_apply(
        &self,
        working_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.init(working_dir).await?;
        let args = with_vars(&["apply", "-input=false", "-auto-approve", "-no-color"], variables);
        self.run_with_retries(working_dir, &args).await?;
        Ok(())
    }

    /// terraform output -json
    pub async fn output(&self, working_dir: &Path) -> Result<ProvisionOutputs> {
        let args = to_args(&["output", "-json", "-no-color"]);
        let stdout = self.run_with_retries(working_dir, &args).await?;
        parse_outputs(&stdout)
    }

    /// terraform destroy
    pub async fn destroy(
        &self,
        working_dir: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<()> {
        let args = with_vars(
            &["destroy", "-input=false", "-auto-approve", "-no-color"],
            variables,
        );
        self.run_with_retries(working_dir, &args).await?;
        Ok(())
    }
}

/// One entry of `terraform output -json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEntry {
    #[serde(default)]
    pub sensitive: bool,

    #[serde(rename = "type", default)]
    pub output_type: serde_json::Value,

    pub value: serde_json::Value,
}

/// Parse `terraform output -json`
pub fn parse_outputs(stdout: &str) -> Result<ProvisionOutputs> {
    if stdout.trim().is_empty() {
        return Ok(ProvisionOutputs::new());
    }

    let entries: HashMap<String, OutputEntry> = serde_json::from_str(stdout)?;
    Ok(entries
        .into_iter()
        .fold(ProvisionOutputs::new(), |outputs, (name, entry)| {
            outputs.with_value(name, entry.value)
        }))
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(TerraformError::from))
        .collect()
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Append `-var key=value` pairs; BTreeMap keeps the order stable
fn with_vars(args: &[&str], variables: &BTreeMap<String, String>) -> Vec<String> {
    let mut args = to_args(args);
    for (key, value) in variables {
        args.push("-var".to_string());
        args.push(format!("{}={}", key, value));
    }
    args
}

/// terraform prints some errors on stdout; keep the last lines for context
fn tail(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(10);
    format!("\n{}", lines[start..].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_vars() {
        let vars: BTreeMap<String, String> = [
            ("test_name".to_string(), "terratest-ab12cd".to_string()),
            ("data_expiry".to_string(), "1-month".to_string()),
        ]
        .into_iter()
        .collect();

        let args = with_vars(&["apply", "-auto-approve"], &vars);
        assert_eq!(
            args,
            vec![
                "apply",
                "-auto-approve",
                "-var",
                "data_expiry=1-month",
                "-var",
                "test_name=terratest-ab12cd",
            ]
        );
    }

    #[test]
    fn test_parse_outputs() {
        let stdout = r#"{
            "bucket_name": {"sensitive": false, "type": "string", "value": "terratest-ab12cd"},
            "bucket_arn": {"sensitive": false, "type": "string", "value": "arn:aws:s3:::terratest-ab12cd"}
        }"#;

        let outputs = parse_outputs(stdout).unwrap();
        assert_eq!(outputs.string("bucket_name").unwrap(), "terratest-ab12cd");
        assert_eq!(outputs.values.len(), 2);
    }

    #[test]
    fn test_parse_empty_outputs() {
        assert!(parse_outputs("").unwrap().values.is_empty());
        assert!(parse_outputs("{}\n").unwrap().values.is_empty());
        assert!(parse_outputs("not json").is_err());
    }

    #[test]
    fn test_default_retryable_errors() {
        let tf = Terraform::new("terraform").unwrap();

        assert!(tf.is_retryable(
            "Error installing provider \"aws\": Get https://releases: net/http: TLS handshake timeout"
        ));
        assert!(tf.is_retryable("rpc error: timeout while waiting for plugin to start"));
        assert!(!tf.is_retryable("Error: Invalid value for variable \"data_expiry\""));
    }

    #[test]
    fn test_custom_retryable_errors() {
        let tf = Terraform::new("terraform")
            .unwrap()
            .with_retryable_errors(&["BucketAlreadyExists"])
            .unwrap();

        assert!(tf.is_retryable("Error: BucketAlreadyExists: try again"));
        assert!(!tf.is_retryable("TLS handshake timeout"));
        assert!(matches!(
            Terraform::new("terraform").unwrap().with_retryable_errors(&["("]),
            Err(TerraformError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail(""), "");
        assert_eq!(tail("\nError: boom\n\n"), "\nError: boom");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let tf = Terraform::new("terraform-binary-that-does-not-exist").unwrap();

        let err = tf.init(dir.path()).await.unwrap_err();
        assert!(matches!(err, TerraformError::BinaryNotFound(_)));
    }
}
