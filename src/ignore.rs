//! Cross-repository list of release versions that must not be proposed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::release::{FetchError, GitHubClient};

/// Trait describing which package versions the bot must skip.
pub trait VersionIgnore {
  /// Returns `true` when `version` of `package` should not be proposed.
  fn is_ignored(&self, package: &str, version: &str) -> bool;
}

/// Mapping of package name to a version tag that should be ignored.
///
/// The document is a flat JSON object such as `{"appstore": "2.3"}`. Entries whose value is
/// not a string are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
  entries: BTreeMap<String, String>,
}

/// Errors that can occur while loading the ignore list.
#[derive(Debug, Error)]
pub enum IgnoreListError {
  /// Failed to read the ignore file from disk.
  #[error("failed to read {}: {source}", .path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    #[source]
    source: std::io::Error,
  },
  /// Failed to parse the JSON ignore file.
  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    #[source]
    source: serde_json::Error,
  },
  /// Failed to download the published ignore list.
  #[error(transparent)]
  Fetch(#[from] FetchError),
}

impl IgnoreList {
  /// Load the list from a local file. A missing file yields an empty list.
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, IgnoreListError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(Self::default());
      }
      Err(err) => {
        return Err(IgnoreListError::Io {
          path: path.to_path_buf(),
          source: err,
        });
      }
    };

    let document: Map<String, Value> =
      serde_json::from_str(&contents).map_err(|err| IgnoreListError::Parse {
        path: path.to_path_buf(),
        source: err,
      })?;
    Ok(Self::from(document))
  }

  /// Download the published list.
  pub fn fetch(client: &GitHubClient, url: &str) -> Result<Self, IgnoreListError> {
    let document: Map<String, Value> = client.fetch_json(url)?;
    Ok(Self::from(document))
  }

  /// Ignored version for `package`, if any.
  pub fn ignored_version(&self, package: &str) -> Option<&str> {
    self.entries.get(package).map(String::as_str)
  }

  /// Number of packages with an ignored version.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when nothing is ignored.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl VersionIgnore for IgnoreList {
  fn is_ignored(&self, package: &str, version: &str) -> bool {
    self.ignored_version(package) == Some(version)
  }
}

impl From<Map<String, Value>> for IgnoreList {
  fn from(document: Map<String, Value>) -> Self {
    let entries = document
      .into_iter()
      .filter_map(|(package, value)| match value {
        Value::String(version) => Some((package, version)),
        _ => None,
      })
      .collect();
    Self { entries }
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IgnoreList {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      entries: iter
        .into_iter()
        .map(|(package, version)| (package.into(), version.into()))
        .collect(),
    }
  }
}
