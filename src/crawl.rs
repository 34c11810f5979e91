//! Run orchestration.
//!
//! One run = one source: resolve it by name, open a session, capture the
//! listing, close the session, extract and normalize, optionally cap the
//! record count, then reconcile into the store (or print a preview on a
//! dry run). Only the failures in [`RunError`] abort a run; everything
//! record-level ends up in [`RunResult::errors`].

use std::time::Instant;

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use tool_harvest_core::models::{ParsedTool, RunResult};
use tool_harvest_core::normalize::normalize;
use tool_harvest_core::reconcile::upsert_tools;
use tool_harvest_core::store::ToolStore;

use crate::config::Config;
use crate::sources::SourceRegistry;
use crate::sqlite_store::SqliteStore;
use crate::stats::print_stats;

/// Number of records shown in a dry-run preview.
pub const PREVIEW_LEN: usize = 3;

/// Fatal, run-level failures. Nothing is reconciled when one occurs.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Unknown source: '{name}'. Available: {}", available.join(", "))]
    UnknownSource { name: String, available: Vec<String> },

    #[error("Failed to start a session for source '{source_name}'")]
    Session {
        source_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to load {url}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to capture page content")]
    Content(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Keep only the first `limit` extracted records.
    pub limit: Option<usize>,
    /// Extract and normalize, but do not write.
    pub dry_run: bool,
}

#[derive(Debug)]
pub enum RunReport {
    /// Records were reconciled.
    Completed(RunResult),
    /// Dry run: nothing written.
    Preview {
        /// Records that would have been reconciled.
        total: usize,
        /// The first few of them.
        sample: Vec<ParsedTool>,
    },
    /// The listing produced no records; nothing was reconciled.
    Empty,
}

/// Execute one run of `source_name` against `store`.
///
/// The session is closed before this returns, whatever the outcome; a
/// close failure is logged and never replaces the run's own result.
pub async fn run(
    registry: &SourceRegistry,
    store: &dyn ToolStore,
    source_name: &str,
    options: &RunOptions,
) -> Result<RunReport, RunError> {
    let source = registry.resolve(source_name)?;
    info!("Starting crawl of source: {}", source.name());

    let mut session = source
        .initialize()
        .await
        .map_err(|e| RunError::Session {
            source_name: source_name.to_string(),
            source: e,
        })?;

    let acquired = session.acquire_content().await;
    if let Err(e) = session.close().await {
        warn!("Failed to close session cleanly: {:#}", e);
    }
    let snapshot = acquired?;

    let tools: Vec<ParsedTool> = source
        .extract(&snapshot)
        .into_iter()
        .map(|raw| normalize(raw, source.pricing_table()))
        .collect();

    if tools.is_empty() {
        warn!("No tools extracted from {}", snapshot.url);
        return Ok(RunReport::Empty);
    }

    let extracted = tools.len();
    let mut tools = tools;
    if let Some(limit) = options.limit {
        tools.truncate(limit);
        info!("Extracted {} tools, keeping {}", extracted, tools.len());
    } else {
        info!("Extracted {} tools", extracted);
    }

    if options.dry_run {
        return Ok(RunReport::Preview {
            total: tools.len(),
            sample: tools.into_iter().take(PREVIEW_LEN).collect(),
        });
    }

    Ok(RunReport::Completed(upsert_tools(store, &tools).await))
}

/// CLI entry for `harvest crawl`.
pub async fn run_crawl(config: &Config, source: &str, options: RunOptions) -> Result<()> {
    let start = Instant::now();
    let registry = SourceRegistry::from_config(config)?;

    // Unknown names fail before the database or a browser is touched.
    registry.resolve(source)?;

    let store = SqliteStore::open(config).await?;
    let report = run(&registry, &store, source, &options).await?;

    print_report(source, &report);
    if let RunReport::Completed(_) = report {
        print_stats(&store.stats().await?);
    }
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Crawl of {} finished", source
    );

    store.close().await;
    Ok(())
}

/// Print a run report to stdout.
pub fn print_report(source: &str, report: &RunReport) {
    match report {
        RunReport::Completed(result) => {
            println!("crawl {}", source);
            println!("  parsed:   {}", result.parsed);
            println!("  saved:    {}", result.saved);
            println!("  updated:  {}", result.updated);
            println!("  errors:   {}", result.errors.len());
            println!("  duration: {}ms", result.duration.as_millis());
            for error in &result.errors {
                println!("    - {}", error);
            }
            println!("ok");
        }
        RunReport::Preview { total, sample } => {
            println!("crawl {} (dry-run)", source);
            println!("  tools found: {}", total);
            print_preview(sample);
        }
        RunReport::Empty => {
            println!("crawl {}", source);
            println!("  no tools extracted");
        }
    }
}

/// Numbered preview lines: name, category, pricing, truncated description, url.
pub fn print_preview(tools: &[ParsedTool]) {
    for (i, tool) in tools.iter().enumerate() {
        println!("  {}. {} ({}) - {}", i + 1, tool.name, tool.category, tool.pricing);
        println!("     {}", truncate(&tool.description, 100));
        println!("     {}", tool.url);
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 100), "short");
        let long = "é".repeat(120);
        let cut = truncate(&long, 100);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 103);
    }

    #[test]
    fn test_unknown_source_message() {
        let err = RunError::UnknownSource {
            name: "nope".to_string(),
            available: vec!["futuretools".to_string(), "saved".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown source: 'nope'. Available: futuretools, saved"
        );
    }
}
