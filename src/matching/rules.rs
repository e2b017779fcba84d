use std::collections::BTreeSet;

use crate::models::PackageAsset;

/// Why an asset was left out of URL reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The asset has no `url` field.
    MissingUrl,
    /// The URL is not hosted under the configured prefix (external mirrors, etc.).
    ForeignHost,
    /// The asset's category tag is in the excluded set.
    ExcludedType,
}

/// Caller supplied filters deciding which assets take part in reconciliation.
///
/// Nothing here has a baked-in default; the hosting prefix and excluded categories come from
/// configuration so the matcher works for any hosting provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRules {
    url_prefix: String,
    excluded_types: BTreeSet<String>,
}

impl MatchRules {
    /// Create rules for the given hosting prefix and excluded category tags.
    pub fn new(
        url_prefix: impl Into<String>,
        excluded_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            excluded_types: excluded_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Prefix every reconciled asset URL must start with.
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Category tags that are never reconciled.
    pub fn excluded_types(&self) -> &BTreeSet<String> {
        &self.excluded_types
    }

    /// Returns the reason an asset must be skipped, or `None` when it is eligible.
    ///
    /// An unset category tag is compared as the empty string.
    pub fn skip_reason(&self, asset: &PackageAsset) -> Option<SkipReason> {
        self.eligible_url(asset).err()
    }

    /// The URL of an eligible asset, or the reason it is skipped.
    pub fn eligible_url<'a>(&self, asset: &'a PackageAsset) -> Result<&'a str, SkipReason> {
        let url = asset.url().ok_or(SkipReason::MissingUrl)?;
        if !url.starts_with(&self.url_prefix) {
            return Err(SkipReason::ForeignHost);
        }
        let category = asset.asset_type().unwrap_or("");
        if self.excluded_types.contains(category) {
            return Err(SkipReason::ExcludedType);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(url: Option<&str>, asset_type: Option<&str>) -> PackageAsset {
        match url {
            Some(url) => PackageAsset::new(url, asset_type),
            None => PackageAsset::from(serde_json::json!({ "type": asset_type })),
        }
    }

    fn rules() -> MatchRules {
        MatchRules::new("https://github.com/", ["icon", "banner", "screenshot"])
    }

    #[test]
    fn accepts_hosted_generic_assets() {
        let rules = rules();
        assert_eq!(
            rules.skip_reason(&asset(Some("https://github.com/a/b/x.zip"), None)),
            None
        );
        assert_eq!(
            rules.skip_reason(&asset(Some("https://github.com/a/b/x.zip"), Some("zip"))),
            None
        );
    }

    #[test]
    fn rejects_foreign_hosts_and_missing_urls() {
        let rules = rules();
        assert_eq!(
            rules.skip_reason(&asset(Some("https://mirror.example/x.zip"), None)),
            Some(SkipReason::ForeignHost)
        );
        assert_eq!(
            rules.skip_reason(&asset(None, None)),
            Some(SkipReason::MissingUrl)
        );
    }

    #[test]
    fn rejects_excluded_categories() {
        let rules = rules();
        for category in ["icon", "banner", "screenshot"] {
            assert_eq!(
                rules.skip_reason(&asset(Some("https://github.com/a/b/i.png"), Some(category))),
                Some(SkipReason::ExcludedType)
            );
        }
    }

    #[test]
    fn empty_string_exclusion_covers_untagged_assets() {
        let rules = MatchRules::new("https://github.com/", [""]);
        assert_eq!(
            rules.skip_reason(&asset(Some("https://github.com/a/b/x.zip"), None)),
            Some(SkipReason::ExcludedType)
        );
    }

    #[test]
    fn eligible_url_hands_back_the_current_url() {
        let rules = rules();
        let hosted = asset(Some("https://github.com/a/b/x.zip"), Some("zip"));
        assert_eq!(
            rules.eligible_url(&hosted),
            Ok("https://github.com/a/b/x.zip")
        );
        assert_eq!(
            rules.eligible_url(&asset(None, Some("zip"))),
            Err(SkipReason::MissingUrl)
        );
    }
}
