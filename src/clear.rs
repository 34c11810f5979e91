//! Catalog wipe for `harvest clear`.

use anyhow::Result;
use tracing::info;

use tool_harvest_core::store::ToolStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Delete every tool and category. Without `confirmed` this only warns.
pub async fn run_clear(config: &Config, confirmed: bool) -> Result<()> {
    if !confirmed {
        println!("This deletes every harvested tool and category.");
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }

    let store = SqliteStore::open(config).await?;
    let (tools, categories) = store.clear().await?;
    store.close().await;

    info!(tools, categories, "Catalog cleared");
    println!("Deleted {} tools and {} categories.", tools, categories);
    Ok(())
}
