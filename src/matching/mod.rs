//! Reconciliation of package asset URLs against a newly published release.
//!
//! The edit distance, the eligibility rules and the selection loop live in separate
//! submodules so each can be tested on its own. Nothing in here performs I/O.

mod levenshtein;
mod reconcile;
mod rules;

pub use levenshtein::distance;
pub use reconcile::{AssetOutcome, MatchReport, reconcile_assets};
pub use rules::{MatchRules, SkipReason};
