//! Upsert reconciliation of parsed tools into a [`ToolStore`].
//!
//! Records are written one at a time, in input order, each awaited before
//! the next. There is no transaction spanning the batch: a failure on one
//! record is recorded in [`RunResult::errors`] and the batch continues.

use std::time::Instant;

use anyhow::Result;

use crate::models::{ParsedTool, RunResult, Tool};
use crate::store::ToolStore;

/// Outcome of reconciling a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Saved,
    Updated,
}

/// Resolve the category, then upsert the tool keyed by url.
pub async fn upsert_one(store: &dyn ToolStore, tool: &ParsedTool) -> Result<(Tool, UpsertOutcome)> {
    let category_id = store.upsert_category(&tool.category).await?;
    let stored = store.upsert_tool(tool, &category_id).await?;
    let outcome = if stored.is_new() {
        UpsertOutcome::Saved
    } else {
        UpsertOutcome::Updated
    };
    Ok((stored, outcome))
}

/// Reconcile a batch and summarize it.
///
/// `parsed` is the input length and every record is attempted exactly
/// once, so the result is always balanced.
pub async fn upsert_tools(store: &dyn ToolStore, tools: &[ParsedTool]) -> RunResult {
    let start = Instant::now();
    let mut result = RunResult {
        parsed: tools.len(),
        ..Default::default()
    };

    for tool in tools {
        match upsert_one(store, tool).await {
            Ok((stored, UpsertOutcome::Saved)) => {
                result.saved += 1;
                tracing::debug!(id = %stored.id, url = %stored.url, "saved tool");
            }
            Ok((stored, UpsertOutcome::Updated)) => {
                result.updated += 1;
                tracing::debug!(id = %stored.id, url = %stored.url, "updated tool");
            }
            Err(e) => {
                let message = format!("Failed to process tool \"{}\": {:#}", tool.name, e);
                tracing::error!("{}", message);
                result.errors.push(message);
            }
        }
    }

    result.duration = start.elapsed();
    tracing::info!(
        parsed = result.parsed,
        saved = result.saved,
        updated = result.updated,
        errors = result.errors.len(),
        duration_ms = result.duration.as_millis() as u64,
        "reconciliation finished"
    );
    result
}
