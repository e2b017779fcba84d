use std::collections::HashMap;

use crate::matching::levenshtein::distance;
use crate::matching::rules::{MatchRules, SkipReason};
use crate::models::{PackageAsset, ReleaseAsset};

/// What reconciliation did with a single current asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    /// The asset was not considered.
    Skipped(SkipReason),
    /// No release asset carried a download URL, so the asset was left alone.
    NoCandidates,
    /// The closest candidate is the URL the asset already had.
    Unchanged {
        /// Index of the chosen candidate in the release asset list.
        candidate: usize,
    },
    /// The asset URL was rewritten to the closest candidate.
    Retargeted {
        /// URL before reconciliation.
        from: String,
        /// URL taken from the release.
        to: String,
        /// Edit distance between the two.
        distance: usize,
        /// Index of the chosen candidate in the release asset list.
        candidate: usize,
    },
}

/// Per-asset outcomes of one reconciliation pass, in asset order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// One outcome for each current asset.
    pub outcomes: Vec<AssetOutcome>,
}

impl MatchReport {
    /// Number of assets whose URL was rewritten.
    pub fn retargeted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, AssetOutcome::Retargeted { .. }))
            .count()
    }

    /// Returns `true` when at least one URL changed.
    pub fn changed(&self) -> bool {
        self.retargeted() > 0
    }
}

/// Distances computed during a single [`reconcile_assets`] call.
///
/// Packages frequently list the same URL more than once (for example once per install
/// location), so each distinct current URL keeps one row of distances indexed by candidate.
#[derive(Debug, Default)]
struct DistanceCache {
    rows: HashMap<String, Vec<Option<usize>>>,
}

impl DistanceCache {
    fn row(&mut self, current: &str, width: usize) -> &mut [Option<usize>] {
        self.rows
            .entry(current.to_string())
            .or_insert_with(|| vec![None; width])
    }
}

/// Point each eligible asset at the release asset whose URL is closest to its current one.
///
/// Assets rejected by `rules` are left untouched. Release assets without a usable
/// `browser_download_url` are not candidates. The candidate with the smallest edit distance
/// wins; on equal distances the one listed first in `candidates` is kept. A candidate may be
/// chosen by several assets.
pub fn reconcile_assets(
    assets: &mut [PackageAsset],
    candidates: &[ReleaseAsset],
    rules: &MatchRules,
) -> MatchReport {
    let usable: Vec<(usize, &str)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| candidate.download_url().map(|url| (index, url)))
        .collect();

    let mut cache = DistanceCache::default();
    let mut report = MatchReport::default();

    for asset in assets.iter_mut() {
        let current = match rules.eligible_url(asset) {
            Ok(url) => url,
            Err(reason) => {
                report.outcomes.push(AssetOutcome::Skipped(reason));
                continue;
            }
        };

        let distances = cache.row(current, candidates.len());
        let mut best: Option<(usize, &str, usize)> = None;
        for &(index, url) in &usable {
            let score = *distances[index].get_or_insert_with(|| distance(current, url));
            if best.is_none_or(|(_, _, best_score)| score < best_score) {
                best = Some((index, url, score));
            }
        }

        let outcome = match best {
            None => AssetOutcome::NoCandidates,
            Some((index, url, _)) if url == current => AssetOutcome::Unchanged { candidate: index },
            Some((index, url, score)) => {
                let from = current.to_string();
                asset.set_url(url);
                AssetOutcome::Retargeted {
                    from,
                    to: url.to_string(),
                    distance: score,
                    candidate: index,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    report
}
