//! Reading upstream releases: repository lookup, tag normalisation and release notes.

mod changelog;
pub mod github;
mod version;

pub use changelog::{compose_changelog, escape_newlines, strip_markdown};
pub use github::{FetchError, GitHubClient, GitHubRepo, ReleaseSource};
pub use version::clean_version;
