//! Core data models for CVRF advisories.
//!
//! This module defines the fixed-shape [`Advisory`] record that the decoder
//! produces from the cardinality-ambiguous source documents. Every repeated
//! field is a `Vec` here, whatever the source wrote, and empty fields are
//! omitted from the JSON form.

use crate::error::AdvisoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Base URL of the human-readable advisory pages.
pub const PSIRT_URL: &str = "https://fortiguard.fortinet.com/psirt";

/// One vendor security bulletin.
///
/// Built once by [`crate::decoder::decode`] and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advisory {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub document_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub document_type: String,
    #[serde(skip_serializing_if = "Publisher::is_empty")]
    pub publisher: Publisher,
    #[serde(skip_serializing_if = "Tracking::is_empty")]
    pub tracking: Tracking,
    /// Free-text sections with empty ("None") notes already dropped.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub acknowledgments: Vec<Acknowledgment>,
    #[serde(skip_serializing_if = "Vulnerability::is_empty")]
    pub vulnerability: Vulnerability,
    #[serde(skip_serializing_if = "Branch::is_empty")]
    pub product_tree: Branch,
    /// Set when the "Affected Products" note carried no content, so the
    /// affected versions have to be listed from `product_tree` instead.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub affected_products_unlisted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publisher {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub publisher_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub contact_details: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issuing_authority: String,
}

impl Publisher {
    pub fn is_empty(&self) -> bool {
        self.publisher_type.is_empty()
            && self.contact_details.is_empty()
            && self.issuing_authority.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tracking {
    /// Stable advisory identifier (e.g., "FG-IR-22-398").
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<Revision>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub initial_release_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub current_release_date: String,
}

impl Tracking {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Revision {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub note_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ordinal: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Acknowledgment {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vulnerability {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ordinal: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cve: Vec<String>,
    /// Status type (e.g., "Known Affected") to product identifiers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub product_statuses: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(skip_serializing_if = "Cvss::is_empty")]
    pub cvss: Cvss,
}

impl Vulnerability {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cvss {
    /// Decimal string exactly as published; see [`Advisory::base_score`].
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_score_v3: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vector_v3: String,
}

impl Cvss {
    pub fn is_empty(&self) -> bool {
        self.base_score_v3.is_empty() && self.vector_v3.is_empty()
    }
}

/// One node of the product taxonomy (vendor, product line, version, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub branch_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_product_name: Option<FullProductName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Branch>,
}

impl Branch {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.branch_type.is_empty()
            && self.full_product_name.is_none()
            && self.children.is_empty()
    }
}

/// Leaf payload of a "Product Version" branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullProductName {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// `<ProductName>-<Version>`, e.g. "FortiOS-6.4.10".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub product_id: String,
}

/// Affected versions of one product type, as listed by the product tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedProduct {
    pub product_type: String,
    pub versions: Vec<String>,
}

impl Advisory {
    /// CVSS v3 base score; an unparsable or missing score counts as `0.0`.
    pub fn base_score(&self) -> f64 {
        self.vulnerability
            .cvss
            .base_score_v3
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|score| score.is_finite())
            .unwrap_or(0.0)
    }

    /// Canonical advisory page for this advisory.
    pub fn link(&self) -> String {
        format!("{}/{}", PSIRT_URL, self.tracking.id.trim())
    }

    /// Names of the product types directly below the top-level branch.
    pub fn product_types(&self) -> impl Iterator<Item = &str> {
        self.product_tree
            .children
            .iter()
            .map(|branch| branch.name.trim())
    }

    /// Every product identifier of every status type.
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.vulnerability
            .product_statuses
            .values()
            .flatten()
            .map(String::as_str)
    }

    /// Per product type, the full product names of its children.
    pub fn affected_listing(&self) -> Vec<AffectedProduct> {
        self.product_tree
            .children
            .iter()
            .map(|product| AffectedProduct {
                product_type: product.name.trim().to_string(),
                versions: product
                    .children
                    .iter()
                    .filter_map(|version| version.full_product_name.as_ref())
                    .map(|name| name.text.trim().to_string())
                    .filter(|text| !text.is_empty())
                    .collect(),
            })
            .collect()
    }
}

/// Severity labels accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Inclusive `(min, max)` CVSS v3 score band of this label.
    pub fn score_band(&self) -> (f64, f64) {
        match self {
            Self::Low => (0.1, 3.9),
            Self::Medium => (4.0, 6.9),
            Self::High => (7.0, 8.9),
            Self::Critical => (9.0, 10.0),
        }
    }
}

impl FromStr for Severity {
    type Err = AdvisoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(AdvisoryError::InvalidSeverity(s.to_string())),
        }
    }
}
