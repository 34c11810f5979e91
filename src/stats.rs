//! Catalog statistics.
//!
//! A quick summary of what has been harvested: total tools, counts per
//! category and per pricing tier. Used by `harvest stats` and printed after
//! every completed crawl.

use anyhow::Result;

use tool_harvest_core::models::ToolStats;
use tool_harvest_core::store::ToolStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let stats = store.stats().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Tool Harvest — Database Stats");
    println!("=============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    print_stats(&stats);

    store.close().await;
    Ok(())
}

/// Print totals and the per-category / per-pricing breakdowns.
pub fn print_stats(stats: &ToolStats) {
    println!();
    println!("  Tools:       {}", stats.total);

    if !stats.by_category.is_empty() {
        println!();
        println!("  By category:");
        for (category, count) in sorted_desc(&stats.by_category) {
            println!("    {:<24} {:>6}", category, count);
        }
    }

    if !stats.by_pricing.is_empty() {
        println!();
        println!("  By pricing:");
        for (pricing, count) in sorted_desc(&stats.by_pricing) {
            println!("    {:<24} {:>6}", pricing, count);
        }
    }
    println!();
}

/// Largest count first, ties by name.
fn sorted_desc(counts: &std::collections::BTreeMap<String, i64>) -> Vec<(&String, &i64)> {
    let mut rows: Vec<_> = counts.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    rows
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_sorted_desc() {
        let mut counts = BTreeMap::new();
        counts.insert("Video".to_string(), 1);
        counts.insert("Writing".to_string(), 3);
        counts.insert("Image".to_string(), 1);
        let rows: Vec<&str> = sorted_desc(&counts).iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(rows, vec!["Writing", "Image", "Video"]);
    }
}
