//! Data structures read from package metadata files and release payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Contents of a package's `pkgbuild.json`.
///
/// The document is kept as an ordered JSON object so that writing it back only touches the
/// fields the bot updates; unrelated keys keep their values and their position.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PackageBuild(Map<String, Value>);

impl PackageBuild {
  /// Recorded package version, empty when unset.
  pub fn version(&self) -> &str {
    self.info_str("version")
  }

  /// Upstream project URL, empty when unset.
  pub fn project_url(&self) -> &str {
    self.info_str("url")
  }

  /// Accumulated changelog, empty when unset.
  pub fn changelog(&self) -> &str {
    self.0.get("changelog").and_then(Value::as_str).unwrap_or("")
  }

  /// Store a new version in the `info` block, creating the block when needed.
  pub fn set_version(&mut self, version: &str) {
    let info = self
      .0
      .entry("info")
      .or_insert_with(|| Value::Object(Map::new()));
    if !info.is_object() {
      *info = Value::Object(Map::new());
    }
    if let Value::Object(info) = info {
      info.insert("version".into(), Value::from(version));
    }
  }

  /// Replace the changelog.
  pub fn set_changelog(&mut self, changelog: String) {
    self.0.insert("changelog".into(), Value::String(changelog));
  }

  /// Copy of the asset list; empty when the package declares none.
  pub fn assets(&self) -> Vec<PackageAsset> {
    match self.0.get("assets") {
      Some(Value::Array(items)) => items.iter().cloned().map(PackageAsset::from).collect(),
      _ => Vec::new(),
    }
  }

  /// Write an asset list back in place of the existing one.
  ///
  /// A package without an `assets` key only gains one when the new list is non-empty.
  pub fn replace_assets(&mut self, assets: Vec<PackageAsset>) {
    if assets.is_empty() && !self.0.contains_key("assets") {
      return;
    }
    let items = assets.into_iter().map(PackageAsset::into_value).collect();
    self.0.insert("assets".into(), Value::Array(items));
  }

  /// Raw access to a top-level key.
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  fn info_str(&self, key: &str) -> &str {
    self
      .0
      .get("info")
      .and_then(|info| info.get(key))
      .and_then(Value::as_str)
      .unwrap_or("")
  }
}

/// A file shipped by a package: `{"url": ..., "type": ..., ...}`.
///
/// Entries are kept as raw JSON. An entry that is not an object, or whose `url` is not a
/// string, simply has no URL.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PackageAsset(Value);

impl PackageAsset {
  /// Build an asset entry with a URL and an optional category tag.
  pub fn new(url: impl Into<String>, asset_type: Option<&str>) -> Self {
    let mut object = Map::new();
    object.insert("url".into(), Value::String(url.into()));
    if let Some(asset_type) = asset_type {
      object.insert("type".into(), Value::from(asset_type));
    }
    Self(Value::Object(object))
  }

  /// Download URL.
  pub fn url(&self) -> Option<&str> {
    self.0.get("url").and_then(Value::as_str)
  }

  /// Category tag such as `icon`, `screenshot` or `update`.
  pub fn asset_type(&self) -> Option<&str> {
    self.0.get("type").and_then(Value::as_str)
  }

  /// Overwrite the URL. Has no effect on entries that are not JSON objects.
  pub fn set_url(&mut self, url: &str) {
    if let Value::Object(object) = &mut self.0 {
      object.insert("url".into(), Value::from(url));
    }
  }

  /// Raw access to any other key (destination path, zip layout, ...).
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// Unwrap into the underlying JSON value.
  pub fn into_value(self) -> Value {
    self.0
  }
}

impl From<Value> for PackageAsset {
  fn from(value: Value) -> Self {
    Self(value)
  }
}

/// Release payload as returned by the hosting provider's "latest release" endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Release {
  /// Git tag the release points at.
  #[serde(default)]
  pub tag_name: Option<String>,
  /// Release notes.
  #[serde(default)]
  pub body: Option<String>,
  /// Files attached to the release.
  #[serde(default)]
  pub assets: Vec<ReleaseAsset>,
}

impl Release {
  /// Tag name, empty when unset.
  pub fn tag(&self) -> &str {
    self.tag_name.as_deref().unwrap_or("")
  }

  /// Release notes, empty when unset.
  pub fn notes(&self) -> &str {
    self.body.as_deref().unwrap_or("")
  }
}

/// A file attached to a release. Fields other than these are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReleaseAsset {
  /// File name as shown on the release page.
  #[serde(default)]
  pub name: Option<String>,
  /// Public download URL.
  #[serde(default)]
  pub browser_download_url: Option<String>,
}

impl ReleaseAsset {
  /// Release asset pointing at `url`.
  pub fn with_url(url: impl Into<String>) -> Self {
    Self {
      name: None,
      browser_download_url: Some(url.into()),
    }
  }

  /// Download URL when present and non-empty.
  pub fn download_url(&self) -> Option<&str> {
    self
      .browser_download_url
      .as_deref()
      .filter(|url| !url.is_empty())
  }
}
