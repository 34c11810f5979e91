//! Pricing and category normalization.
//!
//! Maps the free-text pricing signal scraped from a card onto the closed
//! [`Pricing`] vocabulary using an ordered keyword table. The first keyword
//! found (case-insensitive substring) wins; no match means
//! [`Pricing::Contact`]. Category text passes through unchanged apart from
//! trimming; resolving it to a persisted category is the reconciler's job.

use serde::Deserialize;

use crate::models::{ParsedTool, Pricing, RawRecord};

/// One `keyword → pricing` entry of a [`PricingTable`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricingRule {
    pub keyword: String,
    pub value: Pricing,
}

impl PricingRule {
    pub fn new(keyword: &str, value: Pricing) -> Self {
        Self {
            keyword: keyword.to_string(),
            value,
        }
    }
}

/// Ordered keyword table. Order is significant: first match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    rules: Vec<PricingRule>,
}

impl PricingTable {
    /// Build a table, lower-casing keywords once up front.
    pub fn new(rules: Vec<PricingRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| PricingRule {
                keyword: r.keyword.to_lowercase(),
                value: r.value,
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[PricingRule] {
        &self.rules
    }

    /// Map raw pricing text to the closed vocabulary.
    pub fn classify(&self, raw: &str) -> Pricing {
        let text = raw.to_lowercase();
        self.rules
            .iter()
            .find(|r| !r.keyword.is_empty() && text.contains(&r.keyword))
            .map(|r| r.value)
            .unwrap_or(Pricing::Contact)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new(default_pricing_rules())
    }
}

/// Keyword table used when a source does not configure its own.
///
/// Specific keywords come before the shorter ones they contain
/// (`freemium` before `free`), since matching is by substring.
pub fn default_pricing_rules() -> Vec<PricingRule> {
    vec![
        PricingRule::new("freemium", Pricing::Freemium),
        PricingRule::new("trial", Pricing::Freemium),
        PricingRule::new("free", Pricing::Free),
        PricingRule::new("premium", Pricing::Paid),
        PricingRule::new("subscription", Pricing::Paid),
        PricingRule::new("paid", Pricing::Paid),
        PricingRule::new("contact", Pricing::Contact),
        PricingRule::new("$", Pricing::Paid),
    ]
}

/// Category name used when a card carries no category text.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Normalize one extracted record into a [`ParsedTool`].
pub fn normalize(raw: RawRecord, table: &PricingTable) -> ParsedTool {
    let pricing = table.classify(&raw.raw_pricing);
    let category = match raw.raw_category.trim() {
        "" => DEFAULT_CATEGORY.to_string(),
        other => other.to_string(),
    };

    ParsedTool {
        name: raw.name,
        description: raw.description,
        url: raw.url,
        tags: raw.tags,
        category,
        pricing,
        favorite_count: raw.favorite_count,
        source: raw.source,
    }
}
