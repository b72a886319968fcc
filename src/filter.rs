//! Advisory filtering.
//!
//! [`AdvisoryFilter`] decides whether an advisory falls inside a resolved
//! [`FilterCriteria`]. It is a pure function of its inputs: criteria are built
//! once by the caller and shared freely.

use crate::models::{Advisory, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the ends of the score range are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBoundary {
    /// `min <= score <= max` passes.
    #[default]
    Inclusive,
    /// `min < score < max` passes.
    Exclusive,
}

/// Resolved filter criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub min_score: f64,
    pub max_score: f64,
    /// Product types (second tree level) to keep; empty keeps all.
    pub product_types: BTreeSet<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            max_score: 10.0,
            product_types: BTreeSet::new(),
        }
    }
}

impl FilterCriteria {
    pub fn new(min_score: f64, max_score: f64) -> Self {
        Self {
            min_score,
            max_score,
            product_types: BTreeSet::new(),
        }
    }

    /// Criteria covering the score band of a severity level.
    pub fn from_severity(severity: Severity) -> Self {
        let (min_score, max_score) = severity.score_band();
        Self::new(min_score, max_score)
    }

    pub fn with_product_types<I, S>(mut self, product_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.product_types.extend(
            product_types
                .into_iter()
                .map(|product_type| product_type.as_ref().trim().to_string())
                .filter(|product_type| !product_type.is_empty()),
        );
        self
    }
}

/// Filter predicate engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryFilter {
    boundary: ScoreBoundary,
}

impl AdvisoryFilter {
    pub fn new(boundary: ScoreBoundary) -> Self {
        Self { boundary }
    }

    /// Score test and, when product types are requested, product-type test.
    pub fn matches(&self, advisory: &Advisory, criteria: &FilterCriteria) -> bool {
        self.score_matches(advisory, criteria)
            && (criteria.product_types.is_empty() || product_type_matches(advisory, criteria))
    }

    /// Whether the advisory's CVSS v3 base score lies in range.
    ///
    /// Unparsable scores count as `0.0`.
    pub fn score_matches(&self, advisory: &Advisory, criteria: &FilterCriteria) -> bool {
        let score = advisory.base_score();
        match self.boundary {
            ScoreBoundary::Inclusive => !(score < criteria.min_score || score > criteria.max_score),
            ScoreBoundary::Exclusive => {
                !(score <= criteria.min_score || score >= criteria.max_score)
            }
        }
    }

    /// Keep the advisories that match, in order.
    pub fn apply<'a, I>(&self, advisories: I, criteria: &FilterCriteria) -> Vec<&'a Advisory>
    where
        I: IntoIterator<Item = &'a Advisory>,
    {
        advisories
            .into_iter()
            .filter(|advisory| self.matches(advisory, criteria))
            .collect()
    }
}

/// [`AdvisoryFilter::matches`] with inclusive boundaries.
pub fn matches(advisory: &Advisory, criteria: &FilterCriteria) -> bool {
    AdvisoryFilter::default().matches(advisory, criteria)
}

/// Only the product lines directly below the top-level branch are consulted.
fn product_type_matches(advisory: &Advisory, criteria: &FilterCriteria) -> bool {
    advisory.product_types().any(|name| {
        criteria
            .product_types
            .iter()
            .any(|wanted| wanted.trim() == name)
    })
}

/// Product identifier for a product/version pair, e.g. "FortiOS-6.4.10".
pub fn product_id(product: &str, version: &str) -> String {
    format!("{}-{}", product.trim(), version.trim())
}

/// Whether the advisory lists exactly this product version under any status.
///
/// This is an exact identifier match; version ranges in free text are not
/// consulted.
pub fn is_affected(advisory: &Advisory, product: &str, version: &str) -> bool {
    let wanted = product_id(product, version);
    advisory.product_ids().any(|id| id.trim() == wanted)
}

/// Whether `version` is a complete `major.minor.patch` version.
pub fn is_full_version(version: &str) -> bool {
    let parts: Vec<&str> = version.trim().split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Branch, Cvss, Vulnerability};
    use std::collections::BTreeMap;

    fn advisory(score: &str, product_types: &[&str], product_ids: &[&str]) -> Advisory {
        let mut product_statuses = BTreeMap::new();
        product_statuses.insert(
            "Known Affected".to_string(),
            product_ids.iter().map(|id| id.to_string()).collect(),
        );

        Advisory {
            vulnerability: Vulnerability {
                cvss: Cvss {
                    base_score_v3: score.to_string(),
                    vector_v3: String::new(),
                },
                product_statuses,
                ..Default::default()
            },
            product_tree: Branch {
                name: "Fortinet".to_string(),
                branch_type: "Vendor".to_string(),
                children: product_types
                    .iter()
                    .map(|name| Branch {
                        name: name.to_string(),
                        branch_type: "Product Name".to_string(),
                        ..Default::default()
                    })
                    .collect(),
                full_product_name: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_full_range_matches_any_parsable_score() {
        let criteria = FilterCriteria::default();
        for score in ["0.0", "3.1", "9.8", "10.0"] {
            assert!(matches(&advisory(score, &[], &[]), &criteria), "{score}");
        }
    }

    #[test]
    fn test_inclusive_boundaries() {
        let filter = AdvisoryFilter::new(ScoreBoundary::Inclusive);
        let critical = FilterCriteria::from_severity(Severity::Critical);
        assert!(filter.matches(&advisory("9.0", &[], &[]), &critical));
        assert!(filter.matches(&advisory("10.0", &[], &[]), &critical));
        assert!(!filter.matches(&advisory("8.9", &[], &[]), &critical));

        let high = FilterCriteria::from_severity(Severity::High);
        assert!(filter.matches(&advisory("8.9", &[], &[]), &high));
        assert!(!filter.matches(&advisory("9.0", &[], &[]), &high));
    }

    #[test]
    fn test_exclusive_boundaries() {
        let filter = AdvisoryFilter::new(ScoreBoundary::Exclusive);
        let criteria = FilterCriteria::new(7.0, 8.9);
        assert!(!filter.matches(&advisory("7.0", &[], &[]), &criteria));
        assert!(!filter.matches(&advisory("8.9", &[], &[]), &criteria));
        assert!(filter.matches(&advisory("8.1", &[], &[]), &criteria));
    }

    #[test]
    fn test_unparsable_score_fails_positive_minimum() {
        let unparsable = advisory("abc", &[], &[]);
        for boundary in [ScoreBoundary::Inclusive, ScoreBoundary::Exclusive] {
            let filter = AdvisoryFilter::new(boundary);
            assert!(!filter.matches(&unparsable, &FilterCriteria::new(0.1, 10.0)));
            assert!(!filter.matches(&unparsable, &FilterCriteria::from_severity(Severity::Low)));
        }
        // With a zero minimum the score is simply 0.0.
        assert!(matches(&unparsable, &FilterCriteria::default()));
    }

    #[test]
    fn test_product_type_filter_uses_second_level() {
        let fortios = advisory("9.8", &["FortiOS", "FortiProxy"], &["FortiOS-7.2.0"]);

        let wanted = FilterCriteria::default().with_product_types([" FortiProxy "]);
        assert!(matches(&fortios, &wanted));

        let other = FilterCriteria::default().with_product_types(["FortiClientEMS"]);
        assert!(!matches(&fortios, &other));

        // Vendor and version levels are not product types.
        let vendor = FilterCriteria::default().with_product_types(["Fortinet"]);
        assert!(!matches(&fortios, &vendor));
    }

    #[test]
    fn test_score_and_product_type_must_both_pass() {
        let fortios = advisory("5.0", &["FortiOS"], &[]);
        let criteria = FilterCriteria::from_severity(Severity::Critical).with_product_types(["FortiOS"]);
        assert!(!matches(&fortios, &criteria));
    }

    #[test]
    fn test_apply_keeps_order() {
        let advisories = vec![
            advisory("9.8", &[], &[]),
            advisory("2.0", &[], &[]),
            advisory("9.1", &[], &[]),
        ];
        let kept = AdvisoryFilter::default()
            .apply(&advisories, &FilterCriteria::from_severity(Severity::Critical));
        let scores: Vec<f64> = kept.iter().map(|a| a.base_score()).collect();
        assert_eq!(scores, vec![9.8, 9.1]);
    }

    #[test]
    fn test_is_affected_exact_match() {
        let ems = advisory("9.3", &["FortiClientEMS"], &[" FortiClientEMS-7.2.2 ", "FortiClientEMS-7.0.1"]);
        assert!(is_affected(&ems, "FortiClientEMS", "7.2.2"));
        assert!(is_affected(&ems, " FortiClientEMS ", " 7.0.1"));
        assert!(!is_affected(&ems, "FortiClientEMS", "7.2.3"));
        assert!(!is_affected(&ems, "FortiClientEMS", "7.2"));
    }

    #[test]
    fn test_is_full_version() {
        for (input, want) in [
            ("6.4.2", true),
            ("7.0.14", true),
            ("0.0.1", true),
            ("10.12.0", true),
            (" 7.0.14 ", true),
            ("", false),
            ("7", false),
            ("7.0", false),
            ("7.0.", false),
            ("7..0", false),
            ("a.b.c", false),
            ("7.0.14.1", false),
            ("7.0.14-beta", false),
        ] {
            assert_eq!(is_full_version(input), want, "{input:?}");
        }
    }
}
