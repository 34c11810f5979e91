//! Filtered listing of harvested tools for the CLI.

use anyhow::Result;

use tool_harvest_core::models::Pricing;
use tool_harvest_core::store::{ToolQuery, ToolStore};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Build a [`ToolQuery`] from CLI/HTTP inputs, validating pagination.
pub fn build_query(
    search: Option<String>,
    category: Option<String>,
    pricing: Option<&str>,
    tags: Vec<String>,
    limit: i64,
    offset: i64,
) -> Result<ToolQuery> {
    let pricing = pricing.map(str::parse::<Pricing>).transpose()?;
    let query = ToolQuery {
        search: search.filter(|s| !s.trim().is_empty()),
        category: category.filter(|s| !s.trim().is_empty()),
        pricing,
        tags: tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        limit,
        offset,
    };
    query.validate()?;
    Ok(query)
}

pub async fn run_list(config: &Config, query: &ToolQuery) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let page = store.list_tools(query).await?;
    store.close().await;

    if page.items.is_empty() {
        println!("No tools.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<28} {:<16} {:<9} URL",
        "ID", "NAME", "CATEGORY", "PRICING"
    );
    for item in &page.items {
        println!(
            "{:<36}  {:<28} {:<16} {:<9} {}",
            item.tool.id,
            clip(&item.tool.name, 28),
            clip(&item.category, 16),
            item.tool.pricing,
            item.tool.url
        );
    }
    println!();
    println!(
        "showing {}-{} of {}",
        page.offset + 1,
        page.offset + page.items.len() as i64,
        page.total
    );

    Ok(())
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let head: String = text.chars().take(width - 1).collect();
        format!("{}…", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query() {
        let q = build_query(
            Some("chat".to_string()),
            Some("".to_string()),
            Some("freemium"),
            vec![" ai ".to_string(), "".to_string()],
            20,
            0,
        )
        .unwrap();
        assert_eq!(q.search.as_deref(), Some("chat"));
        assert!(q.category.is_none());
        assert_eq!(q.pricing, Some(Pricing::Freemium));
        assert_eq!(q.tags, vec!["ai"]);
    }

    #[test]
    fn test_build_query_rejects_bad_input() {
        assert!(build_query(None, None, Some("gratis"), vec![], 20, 0).is_err());
        assert!(build_query(None, None, None, vec![], 0, 0).is_err());
        assert!(build_query(None, None, None, vec![], 20, -5).is_err());
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("abc", 5), "abc");
        assert_eq!(clip("abcdefgh", 5), "abcd…");
    }
}
