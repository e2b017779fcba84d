//! Applying a new upstream release to a package's metadata file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;

use crate::config::BotConfig;
use crate::matching::{MatchReport, MatchRules, reconcile_assets};
use crate::models::{PackageBuild, Release};
use crate::release::{clean_version, compose_changelog, strip_markdown};

/// File name of a package's metadata inside its directory.
pub const PKGBUILD_FILE: &str = "pkgbuild.json";

/// Errors raised while bumping a package.
#[derive(Debug, Error)]
pub enum BumpError {
  /// The release tag is empty once normalised.
  #[error("release has no usable version tag")]
  MissingVersion,
  /// Failed to read or write a metadata file.
  #[error("failed to access {}: {source}", .path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    #[source]
    source: std::io::Error,
  },
  /// A metadata file is not a JSON object.
  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    #[source]
    source: serde_json::Error,
  },
  /// A metadata document could not be rendered.
  #[error("failed to render package metadata: {0}")]
  Render(#[from] serde_json::Error),
}

/// Settings applied to every bump.
#[derive(Debug, Clone, Default)]
pub struct BumpOptions {
  /// Which assets are re-targeted.
  pub rules: MatchRules,
  /// Platform words removed from tags.
  pub strip_words: Vec<String>,
  /// Reduce markdown release notes to plain text.
  pub strip_markdown: bool,
}

impl From<&BotConfig> for BumpOptions {
  fn from(config: &BotConfig) -> Self {
    Self {
      rules: config.match_rules(),
      strip_words: config.version_strip_words.clone(),
      strip_markdown: config.strip_markdown,
    }
  }
}

/// Summary of a bump applied to one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOutcome {
  /// Version recorded before the bump.
  pub previous_version: String,
  /// Normalised version written by the bump.
  pub version: String,
  /// What happened to each asset URL.
  pub report: MatchReport,
}

/// Rewrite `pkgbuild` for `release`: new version, prepended changelog and re-targeted assets.
///
/// Nothing is modified when the release tag normalises to an empty string.
pub fn apply_release(
  pkgbuild: &mut PackageBuild,
  release: &Release,
  options: &BumpOptions,
) -> Result<BumpOutcome, BumpError> {
  let version = clean_version(release.tag(), &options.strip_words);
  if version.is_empty() {
    return Err(BumpError::MissingVersion);
  }

  let previous_version = pkgbuild.version().to_string();
  let notes = if options.strip_markdown {
    strip_markdown(release.notes())
  } else {
    release.notes().to_string()
  };
  let changelog = compose_changelog(&version, &notes, pkgbuild.changelog());

  pkgbuild.set_version(&version);
  pkgbuild.set_changelog(changelog);

  let mut assets = pkgbuild.assets();
  let report = reconcile_assets(&mut assets, &release.assets, &options.rules);
  if report.changed() {
    pkgbuild.replace_assets(assets);
  }

  Ok(BumpOutcome {
    previous_version,
    version,
    report,
  })
}

/// Read a metadata file.
pub fn read_pkgbuild(path: &Path) -> Result<PackageBuild, BumpError> {
  let content = fs::read_to_string(path).map_err(|source| BumpError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&content).map_err(|source| BumpError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

/// Render a metadata document with four-space indentation and unescaped non-ASCII text.
pub fn render_pkgbuild(pkgbuild: &PackageBuild) -> Result<String, BumpError> {
  let mut buffer = Vec::new();
  let mut serializer =
    Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
  pkgbuild.serialize(&mut serializer)?;
  // serde_json only emits valid UTF-8.
  Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write a metadata file, replacing its previous contents.
pub fn write_pkgbuild(path: &Path, pkgbuild: &PackageBuild) -> Result<(), BumpError> {
  let rendered = render_pkgbuild(pkgbuild)?;
  fs::write(path, rendered).map_err(|source| BumpError::Io {
    path: path.to_path_buf(),
    source,
  })
}

/// Read, bump and write back the metadata file at `path`.
pub fn bump_package_file(
  path: &Path,
  release: &Release,
  options: &BumpOptions,
) -> Result<BumpOutcome, BumpError> {
  let mut pkgbuild = read_pkgbuild(path)?;
  let outcome = apply_release(&mut pkgbuild, release, options)?;
  write_pkgbuild(path, &pkgbuild)?;
  Ok(outcome)
}
