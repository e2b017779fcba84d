#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod bump;
pub mod config;
pub mod ignore;
pub mod matching;
pub mod models;
pub mod release;
pub mod repo;
pub mod updater;

pub use bump::{BumpError, BumpOptions, BumpOutcome, apply_release};
pub use config::BotConfig;
pub use ignore::{IgnoreList, VersionIgnore};
pub use matching::{MatchReport, MatchRules, distance, reconcile_assets};
pub use models::{PackageAsset, PackageBuild, Release, ReleaseAsset};
pub use updater::{PackageStatus, PackageUpdate, Updater};
