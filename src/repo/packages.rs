//! Discovery of package directories inside the metadata checkout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::bump::PKGBUILD_FILE;

/// A package directory inside the metadata repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Directory name, which doubles as the package identifier.
    pub name: String,
    /// Path to the package's metadata file.
    pub pkgbuild_path: PathBuf,
}

/// List the packages below `packages_dir`, sorted by name.
///
/// Hidden entries, plain files and directories without a metadata file are skipped.
pub fn list_packages(packages_dir: &Path) -> io::Result<Vec<PackageEntry>> {
    let mut packages = Vec::new();

    for entry in fs::read_dir(packages_dir)?.flatten() {
        if !entry.file_type().is_ok_and(|ft| ft.is_dir()) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let pkgbuild_path = entry.path().join(PKGBUILD_FILE);
        if !pkgbuild_path.is_file() {
            log::debug!("{name} has no {PKGBUILD_FILE}, skipping");
            continue;
        }

        packages.push(PackageEntry {
            name,
            pkgbuild_path,
        });
    }

    packages.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(packages)
}
