//! Source backed by a saved HTML snapshot on disk.
//!
//! The file is taken as already materialized, so no loader runs. Useful
//! for offline re-extraction and for tests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use tool_harvest_core::models::{RawRecord, Snapshot};
use tool_harvest_core::normalize::PricingTable;

use crate::crawl::RunError;
use crate::sources::{Source, SourceSession, SourceSpec};

pub struct FileSource {
    spec: SourceSpec,
    path: PathBuf,
}

impl FileSource {
    pub fn new(spec: SourceSpec) -> Result<Self> {
        let path = spec
            .config
            .path
            .clone()
            .with_context(|| format!("source '{}' has no path configured", spec.name))?;
        Ok(Self { spec, path })
    }
}

#[async_trait]
impl Source for FileSource {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        self.spec.description()
    }

    fn kind(&self) -> &str {
        "file"
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    fn pricing_table(&self) -> &PricingTable {
        &self.spec.pricing
    }

    async fn initialize(&self) -> Result<Box<dyn SourceSession>> {
        Ok(Box::new(FileSession {
            path: self.path.clone(),
            url: self.spec.config.page_url().to_string(),
        }))
    }

    fn extract(&self, snapshot: &Snapshot) -> Vec<RawRecord> {
        self.spec.extract(snapshot)
    }
}

struct FileSession {
    path: PathBuf,
    url: String,
}

#[async_trait]
impl SourceSession for FileSession {
    async fn acquire_content(&mut self) -> Result<Snapshot, RunError> {
        let html = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RunError::Navigation {
                url: format!("file://{}", self.path.display()),
                source: e.into(),
            })?;
        info!(bytes = html.len(), "Read snapshot {}", self.path.display());
        Ok(Snapshot {
            url: self.url.clone(),
            html,
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
