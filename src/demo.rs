//! Fixed demonstration dataset.
//!
//! `harvest demo` reconciles five well-known tools without touching a
//! browser, which exercises the store and the reconciliation path end to
//! end. Running it twice shows the upsert at work: the second run updates
//! every record instead of duplicating it.

use anyhow::Result;
use tracing::info;

use tool_harvest_core::models::{ParsedTool, Pricing};
use tool_harvest_core::reconcile::upsert_tools;
use tool_harvest_core::store::ToolStore;

use crate::config::Config;
use crate::crawl::{print_preview, print_report, RunReport};
use crate::sqlite_store::SqliteStore;
use crate::stats::print_stats;

fn demo_tool(
    name: &str,
    description: &str,
    url: &str,
    tags: &[&str],
    category: &str,
    pricing: Pricing,
) -> ParsedTool {
    ParsedTool {
        name: name.to_string(),
        description: description.to_string(),
        url: url.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        category: category.to_string(),
        pricing,
        favorite_count: None,
        source: "demo".to_string(),
    }
}

pub fn demo_tools() -> Vec<ParsedTool> {
    vec![
        demo_tool(
            "ChatGPT",
            "Conversational AI assistant for writing, answering questions and solving problems",
            "https://chat.openai.com",
            &["chatbot", "text-generation", "ai-assistant"],
            "Writing",
            Pricing::Freemium,
        ),
        demo_tool(
            "Midjourney",
            "High quality AI image generation from text prompts",
            "https://midjourney.com",
            &["image-generation", "art", "creative"],
            "Image",
            Pricing::Paid,
        ),
        demo_tool(
            "Notion AI",
            "AI helper for notes, planning and organizing work",
            "https://notion.so",
            &["productivity", "notes", "planning"],
            "Productivity",
            Pricing::Freemium,
        ),
        demo_tool(
            "Copy.ai",
            "AI copywriter for marketing content",
            "https://copy.ai",
            &["copywriting", "marketing", "content"],
            "Writing",
            Pricing::Freemium,
        ),
        demo_tool(
            "Synthesia",
            "AI video creation with virtual presenters from text",
            "https://synthesia.io",
            &["video-generation", "avatar", "presentation"],
            "Video",
            Pricing::Paid,
        ),
    ]
}

pub async fn run_demo(config: &Config, dry_run: bool) -> Result<()> {
    let tools = demo_tools();
    info!("Prepared {} demo tools", tools.len());

    if dry_run {
        println!("demo (dry-run)");
        println!("  tools found: {}", tools.len());
        print_preview(&tools);
        return Ok(());
    }

    let store = SqliteStore::open(config).await?;
    let result = upsert_tools(&store, &tools).await;
    print_report("demo", &RunReport::Completed(result));
    print_stats(&store.stats().await?);

    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_demo_urls_are_unique() {
        let tools = demo_tools();
        let urls: HashSet<&str> = tools.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls.len(), 5);
        assert!(tools.iter().all(|t| t.source == "demo"));
    }
}
