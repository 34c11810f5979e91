//! Tool retrieval by ID.
//!
//! Used by the `harvest get` CLI command and `GET /api/tools/{id}`.

use anyhow::{bail, Result};

use tool_harvest_core::store::ToolStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// CLI entry point: fetch one tool and print it.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let view = store.get_tool(id).await?;
    store.close().await;

    let Some(view) = view else {
        bail!("tool not found: {}", id);
    };
    let tool = &view.tool;

    println!("--- Tool ---");
    println!("id:             {}", tool.id);
    println!("name:           {}", tool.name);
    println!("url:            {}", tool.url);
    println!("category:       {}", view.category);
    println!("pricing:        {}", tool.pricing);
    if !tool.tags.is_empty() {
        println!("tags:           {}", tool.tags.join(", "));
    }
    if let Some(favorites) = tool.favorite_count {
        println!("favorites:      {}", favorites);
    }
    println!("source:         {}", tool.source);
    println!("created_at:     {}", format_ts_iso(tool.created_at));
    println!("updated_at:     {}", format_ts_iso(tool.updated_at));
    println!();
    println!("{}", tool.description);

    Ok(())
}

/// Format Unix milliseconds as ISO 8601.
pub fn format_ts_iso(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}
