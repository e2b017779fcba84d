//! One pass over every package: look up upstream releases and propose bumps.

use std::path::Path;

use anyhow::{Context, Result};

use crate::bump::{BumpOptions, BumpOutcome, apply_release, read_pkgbuild, write_pkgbuild};
use crate::ignore::VersionIgnore;
use crate::matching::AssetOutcome;
use crate::models::{PackageBuild, Release};
use crate::release::{GitHubRepo, ReleaseSource, clean_version};
use crate::repo::{MetadataRepo, PackageEntry, list_packages};

/// What the update pass decided for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
  /// The metadata file could not be read.
  Unreadable(String),
  /// The project URL does not point at a GitHub repository.
  NotOnGitHub,
  /// The latest release could not be fetched.
  FetchFailed(String),
  /// The latest release has no usable tag.
  MissingTag,
  /// The recorded version already matches the latest release.
  UpToDate(String),
  /// The latest release is on the ignore list.
  Ignored(String),
  /// A bump branch for the latest release already exists in the checkout.
  AlreadyProposed(String),
  /// A bump branch was committed.
  Bumped(BumpOutcome),
  /// Preparing or committing the bump failed.
  BumpFailed(String),
}

/// Result of the update pass for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
  /// Package identifier.
  pub package: String,
  /// Decision taken.
  pub status: PackageStatus,
}

/// Drives release lookups and bump commits over the packages of a metadata checkout.
pub struct Updater<'a, S, R, I> {
  source: &'a S,
  repo: &'a R,
  ignore: &'a I,
  options: BumpOptions,
  push: bool,
}

impl<'a, S, R, I> Updater<'a, S, R, I>
where
  S: ReleaseSource,
  R: MetadataRepo,
  I: VersionIgnore,
{
  /// Create an updater from its collaborators.
  pub fn new(source: &'a S, repo: &'a R, ignore: &'a I, options: BumpOptions) -> Self {
    Self {
      source,
      repo,
      ignore,
      options,
      push: false,
    }
  }

  /// Push each bump branch after committing it.
  pub fn with_push(mut self, push: bool) -> Self {
    self.push = push;
    self
  }

  /// Check every package below `packages_dir`.
  ///
  /// Problems with a single package are logged and recorded in its status; only failing to
  /// list the directory aborts the pass.
  pub fn check_for_updates(&self, packages_dir: &Path) -> Result<Vec<PackageUpdate>> {
    let packages = list_packages(packages_dir)
      .with_context(|| format!("failed to list packages in {}", packages_dir.display()))?;

    let mut updates = Vec::with_capacity(packages.len());
    for entry in &packages {
      log::info!("checking package {}", entry.name);
      let status = self.check_package(entry);
      updates.push(PackageUpdate {
        package: entry.name.clone(),
        status,
      });
    }

    let bumped = updates
      .iter()
      .filter(|update| matches!(update.status, PackageStatus::Bumped(_)))
      .count();
    log::info!("checked {} packages, {} bumped", updates.len(), bumped);
    Ok(updates)
  }

  fn check_package(&self, entry: &PackageEntry) -> PackageStatus {
    let package = entry.name.as_str();
    let mut pkgbuild = match read_pkgbuild(&entry.pkgbuild_path) {
      Ok(pkgbuild) => pkgbuild,
      Err(err) => {
        log::warn!("{package}: {err}");
        return PackageStatus::Unreadable(err.to_string());
      }
    };

    let Some(repo) = GitHubRepo::from_url(pkgbuild.project_url()) else {
      log::info!("{package} does not have a valid GitHub URL");
      return PackageStatus::NotOnGitHub;
    };

    let release = match self.source.latest_release(&repo) {
      Ok(release) => release,
      Err(err) => {
        log::warn!("failed to fetch latest release for {package}: {err}");
        return PackageStatus::FetchFailed(err.to_string());
      }
    };

    let current = clean_version(pkgbuild.version(), &self.options.strip_words);
    let latest = clean_version(release.tag(), &self.options.strip_words);
    if latest.is_empty() {
      log::info!("{package}: latest release of {repo} has no usable tag");
      return PackageStatus::MissingTag;
    }
    if latest == current {
      log::info!("no update for {package}, current version is {current}");
      return PackageStatus::UpToDate(latest);
    }
    if self.ignore.is_ignored(package, &latest) {
      log::info!("{package} {latest} is on the ignore list");
      return PackageStatus::Ignored(latest);
    }

    let branch = format!("{package}-{latest}");
    match self.repo.has_branch(&branch) {
      Ok(true) => {
        log::info!("{package} {latest} was already proposed on {branch}");
        return PackageStatus::AlreadyProposed(latest);
      }
      Ok(false) => {}
      Err(err) => {
        log::warn!("failed to look up branch {branch}: {err:#}");
        return PackageStatus::BumpFailed(format!("{err:#}"));
      }
    }

    log::info!("new update found for {package}: {current} -> {latest}");
    match self.propose(entry, &mut pkgbuild, &release, &branch) {
      Ok(outcome) => PackageStatus::Bumped(outcome),
      Err(err) => {
        log::warn!("failed to bump {package}: {err:#}");
        PackageStatus::BumpFailed(format!("{err:#}"))
      }
    }
  }

  fn propose(
    &self,
    entry: &PackageEntry,
    pkgbuild: &mut PackageBuild,
    release: &Release,
    branch: &str,
  ) -> Result<BumpOutcome> {
    self
      .repo
      .start_branch(branch)
      .with_context(|| format!("failed to create branch for {}", entry.name))?;

    let committed = self.commit_bump(entry, pkgbuild, release);
    let restored = self.repo.return_to_base();
    let outcome = committed?;
    restored.context("failed to return to the base branch")?;
    Ok(outcome)
  }

  fn commit_bump(
    &self,
    entry: &PackageEntry,
    pkgbuild: &mut PackageBuild,
    release: &Release,
  ) -> Result<BumpOutcome> {
    let package = entry.name.as_str();
    let outcome = apply_release(pkgbuild, release, &self.options)?;
    log_asset_outcomes(package, &outcome);
    write_pkgbuild(&entry.pkgbuild_path, pkgbuild)?;

    self
      .repo
      .commit_all(&format!("[auto] Update {package} to {}", outcome.version))?;
    if self.push {
      self.repo.push()?;
    }
    Ok(outcome)
  }
}

fn log_asset_outcomes(package: &str, outcome: &BumpOutcome) {
  for (index, asset) in outcome.report.outcomes.iter().enumerate() {
    match asset {
      AssetOutcome::Retargeted { from, to, distance, .. } => {
        log::info!("{package}: asset {index} {from} -> {to} (distance {distance})");
      }
      AssetOutcome::NoCandidates => {
        log::info!("{package}: asset {index} has no release candidate, left unchanged");
      }
      AssetOutcome::Unchanged { .. } => {
        log::debug!("{package}: asset {index} already points at the release");
      }
      AssetOutcome::Skipped(reason) => {
        log::debug!("{package}: asset {index} skipped ({reason:?})");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::collections::{HashMap, HashSet};
  use std::fs;
  use std::process::Command;

  use anyhow::bail;
  use tempfile::tempdir;

  use crate::bump::PKGBUILD_FILE;
  use crate::config::BotConfig;
  use crate::ignore::IgnoreList;
  use crate::models::ReleaseAsset;
  use crate::release::FetchError;
  use crate::repo::GitCli;

  #[derive(Default)]
  struct StubSource {
    releases: HashMap<String, Release>,
  }

  impl ReleaseSource for StubSource {
    fn latest_release(&self, repo: &GitHubRepo) -> Result<Release, FetchError> {
      self
        .releases
        .get(&repo.to_string())
        .cloned()
        .ok_or_else(|| FetchError::Status {
          url: repo.latest_release_url("https://api.github.com"),
          status: 404,
          body: "Not Found".into(),
        })
    }
  }

  #[derive(Default)]
  struct RecordingRepo {
    calls: RefCell<Vec<String>>,
    branches: RefCell<HashSet<String>>,
    fail_commit: bool,
  }

  impl MetadataRepo for RecordingRepo {
    fn has_branch(&self, name: &str) -> Result<bool> {
      Ok(self.branches.borrow().contains(name))
    }

    fn start_branch(&self, name: &str) -> Result<()> {
      self.branches.borrow_mut().insert(name.to_string());
      self.calls.borrow_mut().push(format!("branch {name}"));
      Ok(())
    }

    fn commit_all(&self, message: &str) -> Result<()> {
      if self.fail_commit {
        bail!("nothing to commit");
      }
      self.calls.borrow_mut().push(format!("commit {message}"));
      Ok(())
    }

    fn push(&self) -> Result<()> {
      self.calls.borrow_mut().push("push".into());
      Ok(())
    }

    fn return_to_base(&self) -> Result<()> {
      self.calls.borrow_mut().push("base".into());
      Ok(())
    }
  }

  fn write_package(root: &Path, name: &str, url: &str, version: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let document = serde_json::json!({
      "info": { "title": name, "version": version, "url": url },
      "changelog": "",
      "assets": [
        { "url": format!("{url}/releases/download/v{version}/{name}.nro"), "type": "update" },
        { "url": format!("{url}/raw/master/icon.png"), "type": "icon" }
      ]
    });
    fs::write(dir.join(PKGBUILD_FILE), document.to_string()).unwrap();
  }

  fn release(url: &str, name: &str, tag: &str) -> Release {
    Release {
      tag_name: Some(tag.into()),
      body: Some("notes".into()),
      assets: vec![ReleaseAsset::with_url(format!(
        "{url}/releases/download/{tag}/{name}.nro"
      ))],
    }
  }

  fn options() -> BumpOptions {
    BumpOptions::from(&BotConfig::default())
  }

  #[test]
  fn bumps_outdated_packages_and_skips_the_rest() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_package(root, "alpha", "https://github.com/a/alpha", "1.0");
    write_package(root, "beta", "https://github.com/b/beta", "2.0");
    write_package(root, "gamma", "https://gitlab.com/c/gamma", "1.0");
    write_package(root, "delta", "https://github.com/d/delta", "1.0");
    write_package(root, "eps", "https://github.com/e/eps", "1.0");

    let mut source = StubSource::default();
    source.releases.insert(
      "a/alpha".into(),
      release("https://github.com/a/alpha", "alpha", "v1.1"),
    );
    source.releases.insert(
      "b/beta".into(),
      release("https://github.com/b/beta", "beta", "v2.0-switch"),
    );
    source.releases.insert(
      "e/eps".into(),
      release("https://github.com/e/eps", "eps", "v1.5"),
    );
    let repo = RecordingRepo::default();
    let ignore: IgnoreList = [("eps", "1.5")].into_iter().collect();

    let updater = Updater::new(&source, &repo, &ignore, options());
    let updates = updater.check_for_updates(root).unwrap();

    let statuses: HashMap<_, _> = updates
      .iter()
      .map(|update| (update.package.as_str(), &update.status))
      .collect();
    assert!(matches!(
      statuses["alpha"],
      PackageStatus::Bumped(outcome) if outcome.version == "1.1"
    ));
    assert_eq!(statuses["beta"], &PackageStatus::UpToDate("2.0".into()));
    assert_eq!(statuses["gamma"], &PackageStatus::NotOnGitHub);
    assert!(matches!(statuses["delta"], PackageStatus::FetchFailed(_)));
    assert_eq!(statuses["eps"], &PackageStatus::Ignored("1.5".into()));

    assert_eq!(
      *repo.calls.borrow(),
      vec![
        "branch alpha-1.1".to_string(),
        "commit [auto] Update alpha to 1.1".to_string(),
        "base".to_string(),
      ]
    );

    let written = read_pkgbuild(&root.join("alpha").join(PKGBUILD_FILE)).unwrap();
    assert_eq!(written.version(), "1.1");
    assert_eq!(written.changelog(), "v1.1\\nnotes");
    let assets = written.assets();
    assert_eq!(
      assets[0].url(),
      Some("https://github.com/a/alpha/releases/download/v1.1/alpha.nro")
    );
    assert_eq!(
      assets[1].url(),
      Some("https://github.com/a/alpha/raw/master/icon.png")
    );
  }

  #[test]
  fn pushes_when_enabled() {
    let dir = tempdir().unwrap();
    write_package(dir.path(), "alpha", "https://github.com/a/alpha", "1.0");
    let mut source = StubSource::default();
    source.releases.insert(
      "a/alpha".into(),
      release("https://github.com/a/alpha", "alpha", "2.0"),
    );
    let repo = RecordingRepo::default();
    let ignore = IgnoreList::default();

    Updater::new(&source, &repo, &ignore, options())
      .with_push(true)
      .check_for_updates(dir.path())
      .unwrap();

    assert_eq!(
      *repo.calls.borrow(),
      vec![
        "branch alpha-2.0".to_string(),
        "commit [auto] Update alpha to 2.0".to_string(),
        "push".to_string(),
        "base".to_string(),
      ]
    );
  }

  #[test]
  fn failed_commits_still_return_to_base() {
    let dir = tempdir().unwrap();
    write_package(dir.path(), "alpha", "https://github.com/a/alpha", "1.0");
    let mut source = StubSource::default();
    source.releases.insert(
      "a/alpha".into(),
      release("https://github.com/a/alpha", "alpha", "2.0"),
    );
    let repo = RecordingRepo {
      fail_commit: true,
      ..RecordingRepo::default()
    };
    let ignore = IgnoreList::default();

    let updates = Updater::new(&source, &repo, &ignore, options())
      .check_for_updates(dir.path())
      .unwrap();

    assert!(matches!(
      &updates[0].status,
      PackageStatus::BumpFailed(message) if message.contains("nothing to commit")
    ));
    assert_eq!(repo.calls.borrow().last().map(String::as_str), Some("base"));
  }

  #[test]
  fn reports_unreadable_metadata_and_missing_tags() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("broken")).unwrap();
    fs::write(root.join("broken").join(PKGBUILD_FILE), "not json").unwrap();
    write_package(root, "untagged", "https://github.com/u/untagged", "1.0");

    let mut source = StubSource::default();
    source.releases.insert("u/untagged".into(), Release::default());
    let repo = RecordingRepo::default();
    let ignore = IgnoreList::default();

    let updates = Updater::new(&source, &repo, &ignore, options())
      .check_for_updates(root)
      .unwrap();

    assert!(matches!(updates[0].status, PackageStatus::Unreadable(_)));
    assert_eq!(updates[1].status, PackageStatus::MissingTag);
    assert!(repo.calls.borrow().is_empty());
  }

  #[test]
  fn missing_packages_dir_is_an_error() {
    let dir = tempdir().unwrap();
    let source = StubSource::default();
    let repo = RecordingRepo::default();
    let ignore = IgnoreList::default();

    let result = Updater::new(&source, &repo, &ignore, options())
      .check_for_updates(&dir.path().join("missing"));

    assert!(result.is_err());
  }

  #[test]
  fn existing_bump_branches_are_not_proposed_again() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_package(root, "alpha", "https://github.com/a/alpha", "1.0");
    let mut source = StubSource::default();
    source.releases.insert(
      "a/alpha".into(),
      release("https://github.com/a/alpha", "alpha", "v1.1"),
    );
    let repo = RecordingRepo::default();
    let ignore = IgnoreList::default();
    let updater = Updater::new(&source, &repo, &ignore, options());

    updater.check_for_updates(root).unwrap();
    // The base branch still carries the old version.
    write_package(root, "alpha", "https://github.com/a/alpha", "1.0");
    let updates = updater.check_for_updates(root).unwrap();

    assert_eq!(
      updates[0].status,
      PackageStatus::AlreadyProposed("1.1".into())
    );
    assert_eq!(repo.calls.borrow().len(), 3);
  }

  fn git_available() -> bool {
    Command::new("git")
      .arg("--version")
      .output()
      .is_ok_and(|output| output.status.success())
  }

  fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
      .arg("-C")
      .arg(dir)
      .args(args)
      .output()
      .unwrap();
    assert!(
      output.status.success(),
      "git {args:?} failed: {}",
      String::from_utf8_lossy(&output.stderr)
    );
  }

  #[test]
  fn repeated_passes_over_a_checkout_keep_the_first_proposal() {
    if !git_available() {
      return;
    }
    let temp = tempdir().unwrap();
    let origin = temp.path().join("origin");
    write_package(
      &origin.join("packages"),
      "alpha",
      "https://github.com/a/alpha",
      "1.0",
    );
    git(&origin, &["init", "-q", "-b", "main"]);
    git(&origin, &["config", "user.name", "Test"]);
    git(&origin, &["config", "user.email", "test@example.com"]);
    git(&origin, &["add", "."]);
    git(&origin, &["commit", "-q", "-m", "initial"]);

    let checkout = GitCli::new(temp.path().join("metadata-repo"), "main");
    checkout
      .clone_fresh(&origin.to_string_lossy(), "Dragonite", "bot@example.com")
      .unwrap();
    let packages = checkout.dir().join("packages");

    let mut source = StubSource::default();
    source.releases.insert(
      "a/alpha".into(),
      release("https://github.com/a/alpha", "alpha", "v1.1"),
    );
    let ignore = IgnoreList::default();
    let updater = Updater::new(&source, &checkout, &ignore, options());

    let first = updater.check_for_updates(&packages).unwrap();
    checkout.refresh().unwrap();
    let second = updater.check_for_updates(&packages).unwrap();

    assert!(matches!(
      &first[0].status,
      PackageStatus::Bumped(outcome) if outcome.version == "1.1"
    ));
    assert_eq!(
      second[0].status,
      PackageStatus::AlreadyProposed("1.1".into())
    );
    let on_base = read_pkgbuild(&packages.join("alpha").join(PKGBUILD_FILE)).unwrap();
    assert_eq!(on_base.version(), "1.0");
  }
}
