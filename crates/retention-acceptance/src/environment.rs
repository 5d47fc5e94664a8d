//! Ephemeral environments
//!
//! Every case gets its own uniquely named copy of the module under test, so cases
//! running at the same time against one account neither collide on resource names
//! nor share terraform state.

use crate::contract::TEST_NAME_VAR;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

/// Source of the unique part of environment names
pub trait IdProvider: Send + Sync {
    fn unique_id(&self) -> String;
}

/// Random lowercase alphanumeric identifiers
#[derive(Debug, Clone)]
pub struct RandomIdProvider {
    length: usize,
}

impl RandomIdProvider {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomIdProvider {
    fn default() -> Self {
        // 36^8 ≈ 2.8e12 names
        Self::new(8)
    }
}

impl IdProvider for RandomIdProvider {
    fn unique_id(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect()
    }
}

/// Deterministic identifiers: `000001`, `000002`, ...
#[derive(Debug, Default)]
pub struct SequenceIdProvider {
    next: AtomicU64,
}

impl SequenceIdProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdProvider for SequenceIdProvider {
    fn unique_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:06}", n)
    }
}

/// `{prefix}-{id}`, lowercased so it is usable in bucket names
pub fn unique_name(prefix: &str, ids: &dyn IdProvider) -> String {
    format!("{}-{}", prefix, ids.unique_id()).to_lowercase()
}

/// An isolated working copy of the module for one case.
///
/// The copy lives in a temporary directory that is removed when the
/// environment is dropped.
#[derive(Debug)]
pub struct Environment {
    unique_name: String,
    working_dir: PathBuf,
    variables: BTreeMap<String, String>,
    workspace: TempDir,
}

impl Environment {
    /// Copy `module_root` into a fresh temporary directory and merge the
    /// unique name into the case variables.
    ///
    /// Blocking; call from `spawn_blocking` inside async code.
    pub fn create(
        unique_name: &str,
        module_root: &Path,
        example_dir: &Path,
        case_variables: BTreeMap<String, String>,
    ) -> io::Result<Self> {
        if !module_root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("module root {} is not a directory", module_root.display()),
            ));
        }

        let workspace = tempfile::Builder::new()
            .prefix(&format!("{}-", unique_name))
            .tempdir()?;
        copy_module(module_root, workspace.path())?;

        let working_dir = workspace.path().join(example_dir);
        if !working_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "{} does not exist under {}",
                    example_dir.display(),
                    module_root.display()
                ),
            ));
        }
        tracing::debug!("Copied {} to {}", module_root.display(), workspace.path().display());

        let mut variables = case_variables;
        variables.insert(TEST_NAME_VAR.to_string(), unique_name.to_string());

        Ok(Self {
            unique_name: unique_name.to_string(),
            working_dir,
            variables,
            workspace,
        })
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// Directory terraform runs in
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Root of the temporary copy
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }
}

/// Recursively copy a module tree, leaving out local terraform state,
/// provider caches, VCS metadata and build output.
pub fn copy_module(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let file_type = entry.file_type()?;
        let target = dst.join(entry.file_name());

        if file_type.is_dir() {
            if is_skipped_dir(&name) {
                continue;
            }
            copy_module(&entry.path(), &target)?;
        } else if !is_skipped_file(&name) {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name == "target"
}

fn is_skipped_file(name: &str) -> bool {
    // Pinned versions and provider locks are needed for a reproducible init
    if name == ".terraform-version" || name == ".terraform.lock.hcl" {
        return false;
    }
    name.starts_with('.')
        || name.ends_with(".tfstate")
        || name.ends_with(".tfstate.backup")
        || name == "terraform.tfvars"
        || name == "terraform.tfvars.json"
}
