//! Core data models used throughout Tool Harvest.
//!
//! These types represent the records that flow through the acquisition and
//! reconciliation pipeline: raw extraction output, normalized tools, the
//! persisted entities, and the summary of one run.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Closed pricing vocabulary every tool is normalized into.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Pricing {
    Free,
    Paid,
    Freemium,
    #[default]
    Contact,
}

impl Pricing {
    pub const ALL: [Pricing; 4] = [
        Pricing::Free,
        Pricing::Paid,
        Pricing::Freemium,
        Pricing::Contact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pricing::Free => "Free",
            Pricing::Paid => "Paid",
            Pricing::Freemium => "Freemium",
            Pricing::Contact => "Contact",
        }
    }
}

impl fmt::Display for Pricing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pricing {
    type Err = anyhow::Error;

    /// Case-insensitive parse of the four pricing names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pricing::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown pricing: '{}'. Must be Free, Paid, Freemium, or Contact.",
                    s
                )
            })
    }
}

/// A materialized copy of the source page, detached from the browser.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// URL the snapshot was taken from (after redirects, if known).
    pub url: String,
    /// Full serialized document HTML.
    pub html: String,
}

/// Candidate record produced by the extractor before normalization.
///
/// Never persisted; consumed immediately by [`crate::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub name: String,
    pub description: String,
    /// Absolute URL, already resolved against the source base.
    pub url: String,
    /// Deduplicated tag texts in first-seen order.
    pub tags: Vec<String>,
    pub raw_category: String,
    pub raw_pricing: String,
    pub favorite_count: Option<i64>,
    pub source: String,
}

/// A normalized record ready for reconciliation.
///
/// `url` is the identity key. `pricing` is always one of the closed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTool {
    pub name: String,
    pub description: String,
    pub url: String,
    pub tags: Vec<String>,
    pub category: String,
    pub pricing: Pricing,
    #[serde(default)]
    pub favorite_count: Option<i64>,
    pub source: String,
}

/// Persisted category. Names are unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

/// Persisted tool. Exactly one row per distinct `url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub pricing: Pricing,
    pub favorite_count: Option<i64>,
    pub source: String,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

impl Tool {
    /// True when the last write to this row was its creation.
    pub fn is_new(&self) -> bool {
        self.created_at == self.updated_at
    }
}

/// Summary of one reconciliation batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    /// Number of records handed to reconciliation.
    pub parsed: usize,
    /// Records whose write created a new tool.
    pub saved: usize,
    /// Records whose write updated an existing tool.
    pub updated: usize,
    /// One formatted message per record that failed.
    pub errors: Vec<String>,
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

impl RunResult {
    /// `parsed == saved + updated + errors` when every record was attempted once.
    pub fn is_balanced(&self) -> bool {
        self.parsed == self.saved + self.updated + self.errors.len()
    }
}

fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Read-only aggregation over the persisted tools.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ToolStats {
    pub total: i64,
    /// Tool count per category name.
    pub by_category: BTreeMap<String, i64>,
    /// Tool count per pricing value.
    pub by_pricing: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_parse_case_insensitive() {
        assert_eq!("free".parse::<Pricing>().unwrap(), Pricing::Free);
        assert_eq!("FREEMIUM".parse::<Pricing>().unwrap(), Pricing::Freemium);
        assert_eq!(" Paid ".parse::<Pricing>().unwrap(), Pricing::Paid);
        assert!("gratis".parse::<Pricing>().is_err());
    }

    #[test]
    fn test_pricing_round_trips_through_display() {
        for p in Pricing::ALL {
            assert_eq!(p.to_string().parse::<Pricing>().unwrap(), p);
        }
    }

    #[test]
    fn test_run_result_balance() {
        let result = RunResult {
            parsed: 4,
            saved: 2,
            updated: 1,
            errors: vec!["boom".to_string()],
            duration: Duration::from_millis(5),
        };
        assert!(result.is_balanced());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration_ms"], 5);
    }
}
