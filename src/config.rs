//! Bot configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::matching::MatchRules;

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dragonite.config.json";

/// Discoverable configuration describing the metadata repository and how packages are bumped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BotConfig {
  /// `owner/name` of the package metadata repository on GitHub.
  pub target_repo: String,
  /// Branch that bump branches are created from.
  pub base_branch: String,
  /// Local directory the metadata repository is cloned into.
  pub checkout_dir: String,
  /// Directory inside the checkout holding one folder per package.
  pub packages_subdir: String,
  /// Prefix an asset URL must carry to be re-targeted.
  pub hosting_prefix: String,
  /// Asset categories that are never re-targeted.
  pub excluded_asset_types: Vec<String>,
  /// Platform words removed from versions and tags before comparison.
  pub version_strip_words: Vec<String>,
  /// Published ignore list.
  pub ignore_list_url: String,
  /// Local ignore list used instead of the published one when set.
  pub ignore_list_path: Option<String>,
  /// Base URL of the GitHub REST API.
  pub api_base: String,
  /// Seconds between two update passes in watch mode.
  pub poll_interval_secs: u64,
  /// Commit author name.
  pub git_user_name: String,
  /// Commit author email.
  pub git_user_email: String,
  /// Push bump branches to `origin` after committing.
  pub push: bool,
  /// Reduce markdown release notes to plain text before storing them.
  pub strip_markdown: bool,
}

impl Default for BotConfig {
  fn default() -> Self {
    Self {
      target_repo: "fortheusers/switch-hbas-repo".into(),
      base_branch: "main".into(),
      checkout_dir: "metadata-repo".into(),
      packages_subdir: "packages".into(),
      hosting_prefix: "https://github.com/".into(),
      excluded_asset_types: vec!["icon".into(), "banner".into(), "screenshot".into()],
      version_strip_words: vec!["switch".into()],
      ignore_list_url: "https://wiiubru.com/appstore/ignore.json".into(),
      ignore_list_path: None,
      api_base: "https://api.github.com".into(),
      poll_interval_secs: 60 * 60 * 2,
      git_user_name: "Dragonite".into(),
      git_user_email: "fight@fortheusers.org".into(),
      push: false,
      strip_markdown: false,
    }
  }
}

impl BotConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// When the configuration file does not exist or fails to parse we fall back to default
  /// values so the bot keeps running with the stock setup.
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    match Self::from_path(&candidate) {
      Some(config) => config,
      None => {
        log::debug!("no usable {}, using defaults", candidate.display());
        Self::default()
      }
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
      Ok(config) => Some(config),
      Err(err) => {
        log::warn!("ignoring {}: {err}", path.display());
        None
      }
    }
  }

  /// Matching rules handed to asset reconciliation.
  pub fn match_rules(&self) -> MatchRules {
    MatchRules::new(&self.hosting_prefix, &self.excluded_asset_types)
  }

  /// Clone URL of the metadata repository.
  pub fn clone_url(&self) -> String {
    format!("https://github.com/{}.git", self.target_repo)
  }
}

impl BotConfig {
  /// Path of the metadata repository checkout below `workdir`.
  pub fn checkout_path(&self, workdir: &Path) -> PathBuf {
    workdir.join(&self.checkout_dir)
  }

  /// Path of the packages directory below `workdir`.
  pub fn packages_path(&self, workdir: &Path) -> PathBuf {
    workdir.join(&self.checkout_dir).join(&self.packages_subdir)
  }
}
