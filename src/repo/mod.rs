//! Access to the package metadata repository checkout.

pub mod git;
pub mod packages;

pub use git::{GitCli, MetadataRepo};
pub use packages::{PackageEntry, list_packages};
