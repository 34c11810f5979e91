//! Storage abstraction for Tool Harvest.
//!
//! The [`ToolStore`] trait is the storage contract shared by the
//! reconciliation service (writes) and the query layer (read-only scans).
//! Two entity collections live behind it: categories, unique by name, and
//! tools, unique by url with a reference to a category.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{ParsedTool, Pricing, Tool, ToolStats};

/// Default page size for [`ToolStore::list_tools`].
pub const DEFAULT_PAGE_LIMIT: i64 = 20;
/// Largest page size the query layer accepts.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Filters and pagination for a tool listing.
#[derive(Debug, Clone)]
pub struct ToolQuery {
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
    /// Exact category name.
    pub category: Option<String>,
    pub pricing: Option<Pricing>,
    /// Matches tools carrying any of these tags.
    pub tags: Vec<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ToolQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            pricing: None,
            tags: Vec::new(),
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl ToolQuery {
    /// Reject out-of-range pagination.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            anyhow::bail!("limit must be between 1 and {}", MAX_PAGE_LIMIT);
        }
        if self.offset < 0 {
            anyhow::bail!("offset must be >= 0");
        }
        Ok(())
    }

    /// True when `tool` (with its category name) passes every filter.
    pub fn matches(&self, tool: &Tool, category: &str) -> bool {
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !tool.name.to_lowercase().contains(&needle)
                && !tool.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(ref wanted) = self.category {
            if wanted != category {
                return false;
            }
        }
        if let Some(pricing) = self.pricing {
            if tool.pricing != pricing {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| tool.tags.contains(t)) {
            return false;
        }
        true
    }
}

/// A tool joined with its category name, as returned by the query layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolView {
    #[serde(flatten)]
    pub tool: Tool,
    pub category: String,
}

/// One page of a tool listing.
#[derive(Debug, Clone, Serialize)]
pub struct ToolPage {
    pub items: Vec<ToolView>,
    /// Matches before pagination.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `updated_at` for a write to an existing tool.
///
/// Always strictly after `created_at`, so an update is never mistaken for
/// a creation when both land in the same millisecond.
pub fn next_updated_at(created_at: i64, now: i64) -> i64 {
    now.max(created_at + 1)
}

/// Abstract storage backend for Tool Harvest.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_category`](ToolStore::upsert_category) | Resolve or create a category by name |
/// | [`upsert_tool`](ToolStore::upsert_tool) | Create or update a tool keyed by url |
/// | [`get_tool`](ToolStore::get_tool) | Fetch one tool by id |
/// | [`list_tools`](ToolStore::list_tools) | Filtered, paginated listing, newest first |
/// | [`list_categories`](ToolStore::list_categories) | Category names, ascending |
/// | [`stats`](ToolStore::stats) | Totals by category and pricing |
/// | [`clear`](ToolStore::clear) | Delete every tool and category |
#[async_trait]
pub trait ToolStore: Send + Sync {
    /// Return the id of the category named `name`, creating it if absent.
    async fn upsert_category(&self, name: &str) -> Result<String>;

    /// Create or update the tool with `tool.url`.
    ///
    /// A create sets `created_at == updated_at`. An update rewrites the
    /// mutable fields and moves `updated_at` past `created_at`, leaving
    /// `id` and `created_at` untouched.
    async fn upsert_tool(&self, tool: &ParsedTool, category_id: &str) -> Result<Tool>;

    async fn get_tool(&self, id: &str) -> Result<Option<ToolView>>;

    async fn list_tools(&self, query: &ToolQuery) -> Result<ToolPage>;

    async fn list_categories(&self) -> Result<Vec<String>>;

    async fn stats(&self) -> Result<ToolStats>;

    /// Delete everything. Returns `(tools, categories)` removed.
    async fn clear(&self) -> Result<(u64, u64)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str, tags: &[&str], pricing: Pricing) -> Tool {
        Tool {
            id: "id".to_string(),
            name: name.to_string(),
            description: description.to_string(),
            url: "https://example.com".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category_id: "cat".to_string(),
            pricing,
            favorite_count: None,
            source: "test".to_string(),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_next_updated_at_is_after_creation() {
        assert_eq!(next_updated_at(100, 100), 101);
        assert_eq!(next_updated_at(100, 250), 250);
        assert_eq!(next_updated_at(100, 50), 101);
    }

    #[test]
    fn test_query_validation() {
        assert!(ToolQuery::default().validate().is_ok());
        let q = ToolQuery {
            limit: 0,
            ..Default::default()
        };
        assert!(q.validate().is_err());
        let q = ToolQuery {
            limit: 101,
            ..Default::default()
        };
        assert!(q.validate().is_err());
        let q = ToolQuery {
            offset: -1,
            ..Default::default()
        };
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_query_matches_filters() {
        let t = tool("Copy.ai", "Marketing copy", &["copywriting", "ads"], Pricing::Freemium);

        let q = ToolQuery {
            search: Some("MARKETING".to_string()),
            ..Default::default()
        };
        assert!(q.matches(&t, "Writing"));

        let q = ToolQuery {
            category: Some("Video".to_string()),
            ..Default::default()
        };
        assert!(!q.matches(&t, "Writing"));

        let q = ToolQuery {
            pricing: Some(Pricing::Paid),
            ..Default::default()
        };
        assert!(!q.matches(&t, "Writing"));

        let q = ToolQuery {
            tags: vec!["seo".to_string(), "ads".to_string()],
            ..Default::default()
        };
        assert!(q.matches(&t, "Writing"));
    }
}
