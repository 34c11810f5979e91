//! Live listing source driven by a headless browser.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use tool_harvest_core::models::{RawRecord, Snapshot};
use tool_harvest_core::normalize::PricingTable;

use crate::browser::{BrowserSession, PageSurface};
use crate::config::BrowserConfig;
use crate::crawl::RunError;
use crate::loader::{self, LoaderBounds};
use crate::sources::{Source, SourceSession, SourceSpec};

pub struct BrowserSource {
    spec: SourceSpec,
    browser: BrowserConfig,
}

impl BrowserSource {
    pub fn new(spec: SourceSpec, browser: BrowserConfig) -> Self {
        Self { spec, browser }
    }
}

#[async_trait]
impl Source for BrowserSource {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        self.spec.description()
    }

    fn kind(&self) -> &str {
        "browser"
    }

    fn target(&self) -> String {
        self.spec.config.page_url().to_string()
    }

    fn pricing_table(&self) -> &PricingTable {
        &self.spec.pricing
    }

    async fn initialize(&self) -> Result<Box<dyn SourceSession>> {
        let session = BrowserSession::launch(&self.browser).await?;
        let selectors = &self.spec.config.selectors;
        Ok(Box::new(BrowserSourceSession {
            session,
            page_url: self.spec.config.page_url().to_string(),
            card_selector: selectors.card.clone(),
            load_more: selectors.load_more.clone(),
            bounds: LoaderBounds::from(&self.spec.config.parsing),
        }))
    }

    fn extract(&self, snapshot: &Snapshot) -> Vec<RawRecord> {
        self.spec.extract(snapshot)
    }
}

struct BrowserSourceSession {
    session: BrowserSession,
    page_url: String,
    card_selector: String,
    load_more: Option<String>,
    bounds: LoaderBounds,
}

#[async_trait]
impl SourceSession for BrowserSourceSession {
    async fn acquire_content(&mut self) -> Result<Snapshot, RunError> {
        self.session
            .goto(&self.page_url)
            .await
            .map_err(|source| RunError::Navigation {
                url: self.page_url.clone(),
                source,
            })?;

        let mut surface = PageSurface::new(
            self.session.page(),
            &self.card_selector,
            self.load_more.as_deref(),
        )
        .map_err(RunError::Content)?;

        // Whatever loaded before a scroll failure is still worth extracting.
        match loader::load_all(&mut surface, &self.bounds).await {
            Ok(outcome) => info!(count = outcome.count, state = %outcome.state, "Listing loaded"),
            Err(e) => warn!("Content loader stopped early: {:#}", e),
        }

        let html = self.session.html().await.map_err(RunError::Content)?;
        let url = self
            .session
            .current_url()
            .await
            .unwrap_or_else(|| self.page_url.clone());

        Ok(Snapshot { url, html })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.session.close().await
    }
}
