//! Thin wrapper around the `git` command line for the metadata repository checkout.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Operations the update pass needs from the metadata repository.
pub trait MetadataRepo {
  /// Returns `true` when a local branch called `name` exists.
  fn has_branch(&self, name: &str) -> Result<bool>;
  /// Create and switch to a new branch for a bump.
  fn start_branch(&self, name: &str) -> Result<()>;
  /// Stage every change and commit it.
  fn commit_all(&self, message: &str) -> Result<()>;
  /// Publish the current branch.
  fn push(&self) -> Result<()>;
  /// Discard leftovers and switch back to the base branch.
  fn return_to_base(&self) -> Result<()>;
}

/// Metadata repository checkout driven through the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
  dir: PathBuf,
  base_branch: String,
}

impl GitCli {
  /// Wrap an existing checkout.
  pub fn new(dir: impl Into<PathBuf>, base_branch: impl Into<String>) -> Self {
    Self {
      dir: dir.into(),
      base_branch: base_branch.into(),
    }
  }

  /// Checkout directory.
  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Remove any existing checkout, clone `url` into it and set the commit identity.
  pub fn clone_fresh(&self, url: &str, user_name: &str, user_email: &str) -> Result<()> {
    if self.dir.exists() {
      fs::remove_dir_all(&self.dir)
        .with_context(|| format!("failed to remove {}", self.dir.display()))?;
      log::info!("removed existing checkout {}", self.dir.display());
    }
    if let Some(parent) = self.dir.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    run_git(None, [OsStr::new("clone"), OsStr::new(url), self.dir.as_os_str()])?;
    self.git(["config", "user.name", user_name])?;
    self.git(["config", "user.email", user_email])?;
    Ok(())
  }

  /// Throw away local changes, switch to the base branch and pull.
  pub fn refresh(&self) -> Result<()> {
    self.git(["reset", "--hard", "HEAD"])?;
    self.git(["checkout", self.base_branch.as_str()])?;
    self.git(["pull"])?;
    Ok(())
  }

  fn git<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Result<String> {
    run_git(Some(&self.dir), args.into_iter().map(OsStr::new))
  }
}

impl MetadataRepo for GitCli {
  fn has_branch(&self, name: &str) -> Result<bool> {
    let reference = format!("refs/heads/{name}");
    let listed = self.git(["for-each-ref", "--format=%(refname)", reference.as_str()])?;
    Ok(listed.lines().any(|line| line == reference))
  }

  fn start_branch(&self, name: &str) -> Result<()> {
    self.git(["checkout", "-b", name]).map(drop)
  }

  fn commit_all(&self, message: &str) -> Result<()> {
    self.git(["add", "."])?;
    self.git(["commit", "-m", message]).map(drop)
  }

  fn push(&self) -> Result<()> {
    self.git(["push", "origin", "HEAD"]).map(drop)
  }

  fn return_to_base(&self) -> Result<()> {
    self.git(["reset", "--hard", "HEAD"])?;
    self.git(["checkout", self.base_branch.as_str()]).map(drop)
  }
}

fn run_git<'a>(dir: Option<&Path>, args: impl IntoIterator<Item = &'a OsStr>) -> Result<String> {
  let args: Vec<&OsStr> = args.into_iter().collect();
  let mut command = Command::new("git");
  if let Some(dir) = dir {
    command.arg("-C").arg(dir);
  }
  command.args(&args);

  let rendered = args
    .iter()
    .map(|arg| arg.to_string_lossy())
    .collect::<Vec<_>>()
    .join(" ");
  log::debug!("git {rendered}");

  let output = command
    .output()
    .with_context(|| format!("failed to spawn git {rendered}"))?;
  if !output.status.success() {
    bail!(
      "git {rendered} exited with {}: {}",
      output.status,
      String::from_utf8_lossy(&output.stderr).trim()
    );
  }
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
