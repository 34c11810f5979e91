//! In-memory [`ToolStore`] implementation for tests.
//!
//! Uses `HashMap` behind `std::sync::RwLock` for thread safety. Follows the
//! same identity and timestamp rules as the SQLite store.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Category, ParsedTool, Tool, ToolStats};

use super::{next_updated_at, now_millis, ToolPage, ToolQuery, ToolStore, ToolView};

#[derive(Default)]
struct Inner {
    /// Categories keyed by name.
    categories: HashMap<String, Category>,
    /// Tools keyed by url.
    tools: HashMap<String, Tool>,
}

/// In-memory store for tests.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("in-memory store lock poisoned")
}

impl Inner {
    fn category_name(&self, id: &str) -> String {
        self.categories
            .values()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn view(&self, tool: &Tool) -> ToolView {
        ToolView {
            tool: tool.clone(),
            category: self.category_name(&tool.category_id),
        }
    }
}

#[async_trait]
impl ToolStore for InMemoryStore {
    async fn upsert_category(&self, name: &str) -> Result<String> {
        let mut inner = self.inner.write().map_err(lock_poisoned)?;
        let now = now_millis();
        let category = inner
            .categories
            .entry(name.to_string())
            .or_insert_with(|| Category {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(category.id.clone())
    }

    async fn upsert_tool(&self, tool: &ParsedTool, category_id: &str) -> Result<Tool> {
        let mut inner = self.inner.write().map_err(lock_poisoned)?;
        if !inner.categories.values().any(|c| c.id == category_id) {
            anyhow::bail!("unknown category id {}", category_id);
        }

        let now = now_millis();
        let stored = match inner.tools.get_mut(&tool.url) {
            Some(existing) => {
                existing.name = tool.name.clone();
                existing.description = tool.description.clone();
                existing.tags = tool.tags.clone();
                existing.category_id = category_id.to_string();
                existing.pricing = tool.pricing;
                existing.favorite_count = tool.favorite_count;
                existing.source = tool.source.clone();
                existing.updated_at = next_updated_at(existing.created_at, now);
                existing.clone()
            }
            None => {
                let created = Tool {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    url: tool.url.clone(),
                    tags: tool.tags.clone(),
                    category_id: category_id.to_string(),
                    pricing: tool.pricing,
                    favorite_count: tool.favorite_count,
                    source: tool.source.clone(),
                    created_at: now,
                    updated_at: now,
                };
                inner.tools.insert(tool.url.clone(), created.clone());
                created
            }
        };
        Ok(stored)
    }

    async fn get_tool(&self, id: &str) -> Result<Option<ToolView>> {
        let inner = self.inner.read().map_err(lock_poisoned)?;
        Ok(inner
            .tools
            .values()
            .find(|t| t.id == id)
            .map(|t| inner.view(t)))
    }

    async fn list_tools(&self, query: &ToolQuery) -> Result<ToolPage> {
        let inner = self.inner.read().map_err(lock_poisoned)?;
        let mut matching: Vec<ToolView> = inner
            .tools
            .values()
            .map(|t| inner.view(t))
            .filter(|v| query.matches(&v.tool, &v.category))
            .collect();
        matching.sort_by(|a, b| {
            b.tool
                .created_at
                .cmp(&a.tool.created_at)
                .then_with(|| a.tool.url.cmp(&b.tool.url))
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();

        Ok(ToolPage {
            items,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().map_err(lock_poisoned)?;
        let mut names: Vec<String> = inner.categories.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn stats(&self) -> Result<ToolStats> {
        let inner = self.inner.read().map_err(lock_poisoned)?;
        let mut stats = ToolStats {
            total: inner.tools.len() as i64,
            ..Default::default()
        };
        for tool in inner.tools.values() {
            *stats
                .by_category
                .entry(inner.category_name(&tool.category_id))
                .or_default() += 1;
            *stats
                .by_pricing
                .entry(tool.pricing.to_string())
                .or_default() += 1;
        }
        Ok(stats)
    }

    async fn clear(&self) -> Result<(u64, u64)> {
        let mut inner = self.inner.write().map_err(lock_poisoned)?;
        let removed = (inner.tools.len() as u64, inner.categories.len() as u64);
        inner.tools.clear();
        inner.categories.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pricing;

    fn parsed(url: &str, name: &str, category: &str) -> ParsedTool {
        ParsedTool {
            name: name.to_string(),
            description: format!("{name} description"),
            url: url.to_string(),
            tags: vec!["ai".to_string()],
            category: category.to_string(),
            pricing: Pricing::Free,
            favorite_count: None,
            source: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_category_upsert_reuses_id() {
        let store = InMemoryStore::new();
        let a = store.upsert_category("Writing").await.unwrap();
        let b = store.upsert_category("Writing").await.unwrap();
        let c = store.upsert_category("Video").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.list_categories().await.unwrap(), vec!["Video", "Writing"]);
    }

    #[tokio::test]
    async fn test_tool_upsert_keeps_identity() {
        let store = InMemoryStore::new();
        let cat = store.upsert_category("Writing").await.unwrap();

        let first = store.upsert_tool(&parsed("https://a", "A", "Writing"), &cat).await.unwrap();
        assert!(first.is_new());

        let mut changed = parsed("https://a", "A renamed", "Writing");
        changed.pricing = Pricing::Paid;
        let second = store.upsert_tool(&changed, &cat).await.unwrap();
        assert!(!second.is_new());
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > second.created_at);
        assert_eq!(second.name, "A renamed");
        assert_eq!(second.pricing, Pricing::Paid);

        assert_eq!(store.stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_an_error() {
        let store = InMemoryStore::new();
        let err = store.upsert_tool(&parsed("https://a", "A", "X"), "missing").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_list_get_stats_clear() {
        let store = InMemoryStore::new();
        let writing = store.upsert_category("Writing").await.unwrap();
        let video = store.upsert_category("Video").await.unwrap();
        let a = store.upsert_tool(&parsed("https://a", "Alpha", "Writing"), &writing).await.unwrap();
        store.upsert_tool(&parsed("https://b", "Beta", "Video"), &video).await.unwrap();

        let page = store
            .list_tools(&ToolQuery {
                category: Some("Writing".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].tool.name, "Alpha");
        assert_eq!(page.items[0].category, "Writing");

        let page = store
            .list_tools(&ToolQuery {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);

        let view = store.get_tool(&a.id).await.unwrap().unwrap();
        assert_eq!(view.tool.url, "https://a");
        assert!(store.get_tool("nope").await.unwrap().is_none());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category["Video"], 1);
        assert_eq!(stats.by_pricing["Free"], 2);

        assert_eq!(store.clear().await.unwrap(), (2, 2));
        assert_eq!(store.stats().await.unwrap().total, 0);
    }
}
