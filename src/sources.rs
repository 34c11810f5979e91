//! Source capability interface and registry.
//!
//! A [`Source`] is a named content provider: it knows how to open a
//! session against its listing ([`Source::initialize`]) and how to turn a
//! captured page into raw records ([`Source::extract`]). The
//! [`SourceRegistry`] maps names to sources so the orchestrator never
//! switches on source type.
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │             SourceRegistry             │
//! │  ┌──────────────┐  ┌────────────────┐  │
//! │  │ BrowserSource│  │   FileSource   │  │
//! │  │ (futuretools)│  │ (saved .html)  │  │
//! │  └──────────────┘  └────────────────┘  │
//! └───────────────────┬────────────────────┘
//!                     ▼
//!         crawl::run() → reconcile
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;

use tool_harvest_core::extract::Extractor;
use tool_harvest_core::models::{RawRecord, Snapshot};
use tool_harvest_core::normalize::PricingTable;

use crate::config::{Config, SourceConfig, SourceKind};
use crate::crawl::RunError;
use crate::source_browser::BrowserSource;
use crate::source_file::FileSource;

/// A named content provider with its own extraction rules.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Short type label for listings (`"browser"`, `"file"`, ...).
    fn kind(&self) -> &str;

    /// Where the source reads from, for display.
    fn target(&self) -> String;

    fn pricing_table(&self) -> &PricingTable;

    /// Acquire a session ready to produce content.
    async fn initialize(&self) -> Result<Box<dyn SourceSession>>;

    /// Map a captured page to candidate records, in document order.
    fn extract(&self, snapshot: &Snapshot) -> Vec<RawRecord>;
}

/// A live acquisition session. Must be closed on every exit path.
#[async_trait]
pub trait SourceSession: Send {
    /// Open the listing, materialize it, and capture the result.
    async fn acquire_content(&mut self) -> Result<Snapshot, RunError>;

    /// Release every resource held by the session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Selector configuration compiled once per source.
#[derive(Debug)]
pub struct SourceSpec {
    pub name: String,
    pub config: SourceConfig,
    pub extractor: Extractor,
    pub pricing: PricingTable,
}

impl SourceSpec {
    pub fn new(name: &str, config: SourceConfig) -> Result<Self> {
        let extractor = Extractor::new(&config.selectors, &config.base_url, name)
            .with_context(|| format!("invalid selectors for source '{}'", name))?;
        let pricing = config.pricing_table();
        Ok(Self {
            name: name.to_string(),
            config,
            extractor,
            pricing,
        })
    }

    pub fn description(&self) -> &str {
        self.config.description.as_deref().unwrap_or("")
    }

    pub fn extract(&self, snapshot: &Snapshot) -> Vec<RawRecord> {
        self.extractor.extract(&snapshot.html)
    }
}

/// Registry of every available source, keyed by name.
pub struct SourceRegistry {
    sources: Vec<Box<dyn Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Registry with one source per configured entry plus the built-in
    /// futuretools source.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for (name, cfg) in config.all_sources() {
            let kind = cfg.kind;
            let spec = SourceSpec::new(&name, cfg)?;
            match kind {
                SourceKind::Browser => {
                    registry.register(Box::new(BrowserSource::new(spec, config.browser.clone())))
                }
                SourceKind::File => registry.register(Box::new(FileSource::new(spec)?)),
            }
        }
        Ok(registry)
    }

    /// Register a source. A later registration with the same name wins.
    pub fn register(&mut self, source: Box<dyn Source>) {
        self.sources
            .retain(|s| !s.name().eq_ignore_ascii_case(source.name()));
        self.sources.push(source);
    }

    /// Look a source up by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&dyn Source> {
        self.sources
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
            .map(|s| s.as_ref())
    }

    /// Like [`get`](Self::get), with the error the orchestrator reports.
    pub fn resolve(&self, name: &str) -> Result<&dyn Source, RunError> {
        self.get(name).ok_or_else(|| RunError::UnknownSource {
            name: name.to_string(),
            available: self.names(),
        })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.iter().map(|s| s.name().to_string()).collect();
        names.sort();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Source> {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Print the registered sources as a table.
pub fn list_sources(config: &Config) -> Result<()> {
    let registry = SourceRegistry::from_config(config)?;

    println!("{:<16} {:<8} {:<40} DESCRIPTION", "SOURCE", "KIND", "TARGET");
    let mut sources: Vec<&dyn Source> = registry.iter().collect();
    sources.sort_by(|a, b| a.name().cmp(b.name()));
    for source in sources {
        println!(
            "{:<16} {:<8} {:<40} {}",
            source.name(),
            source.kind(),
            source.target(),
            source.description()
        );
    }

    Ok(())
}
