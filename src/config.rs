use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tool_harvest_core::extract::{CompiledSelectors, SelectorConfig};
use tool_harvest_core::normalize::{default_pricing_rules, PricingRule, PricingTable};

/// Name of the source that is always registered.
pub const FUTURETOOLS: &str = "futuretools";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Chromium binary; discovered on `PATH` and well-known locations when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Extra launch flags appended after the built-in ones.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// Wait after navigation before the loader starts.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            args: Vec::new(),
            user_agent: default_user_agent(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string()
}
fn default_viewport_width() -> u32 {
    1920
}
fn default_viewport_height() -> u32 {
    1080
}
fn default_navigation_timeout_secs() -> u64 {
    30
}
fn default_settle_ms() -> u64 {
    3000
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Live page driven by a headless browser.
    #[default]
    Browser,
    /// Saved HTML snapshot on disk.
    File,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Browser => "browser",
            SourceKind::File => "file",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub description: Option<String>,
    /// Base for resolving relative card links.
    pub base_url: String,
    /// Listing page to open; defaults to `base_url`.
    #[serde(default)]
    pub page_url: Option<String>,
    /// Snapshot file for `kind = "file"`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub parsing: ParsingConfig,
    /// Ordered keyword table; first match wins.
    #[serde(default = "default_pricing_rules")]
    pub pricing: Vec<PricingRule>,
}

impl SourceConfig {
    /// The built-in futuretools.io source.
    pub fn futuretools() -> Self {
        Self {
            kind: SourceKind::Browser,
            description: Some("AI tool directory at futuretools.io".to_string()),
            base_url: "https://www.futuretools.io".to_string(),
            page_url: Some("https://www.futuretools.io".to_string()),
            path: None,
            selectors: SelectorConfig::futuretools(),
            parsing: ParsingConfig::default(),
            pricing: default_pricing_rules(),
        }
    }

    pub fn page_url(&self) -> &str {
        self.page_url.as_deref().unwrap_or(&self.base_url)
    }

    pub fn pricing_table(&self) -> PricingTable {
        PricingTable::new(self.pricing.clone())
    }

    /// Where the source reads from, for display.
    pub fn target(&self) -> String {
        match self.kind {
            SourceKind::Browser => self.page_url().to_string(),
            SourceKind::File => self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        url::Url::parse(&self.base_url)
            .with_context(|| format!("sources.{}.base_url is not a valid URL", name))?;
        if let Some(ref page_url) = self.page_url {
            url::Url::parse(page_url)
                .with_context(|| format!("sources.{}.page_url is not a valid URL", name))?;
        }

        CompiledSelectors::compile(&self.selectors)
            .with_context(|| format!("sources.{}.selectors", name))?;

        let p = &self.parsing;
        if p.scroll_delay_ms == 0 || p.stable_timeout_ms == 0 || p.max_run_time_ms == 0 {
            anyhow::bail!("sources.{}.parsing delays and timeouts must be > 0", name);
        }
        if p.max_attempts == 0 {
            anyhow::bail!("sources.{}.parsing.max_attempts must be > 0", name);
        }
        if p.min_records > p.max_records {
            anyhow::bail!(
                "sources.{}.parsing.min_records ({}) must not exceed max_records ({})",
                name,
                p.min_records,
                p.max_records
            );
        }

        if self.pricing.iter().any(|r| r.keyword.trim().is_empty()) {
            anyhow::bail!("sources.{}.pricing keywords must not be empty", name);
        }

        if self.kind == SourceKind::File && self.path.is_none() {
            anyhow::bail!("sources.{}.path is required when kind = \"file\"", name);
        }

        Ok(())
    }
}

/// Bounds for the content loader.
#[derive(Debug, Deserialize, Clone)]
pub struct ParsingConfig {
    /// Fewer records than this after loading is logged as a warning.
    #[serde(default = "default_min_records")]
    pub min_records: usize,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
    #[serde(default = "default_stable_timeout_ms")]
    pub stable_timeout_ms: u64,
    #[serde(default = "default_max_run_time_ms")]
    pub max_run_time_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_load_more_delay_ms")]
    pub load_more_delay_ms: u64,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            min_records: default_min_records(),
            max_records: default_max_records(),
            scroll_delay_ms: default_scroll_delay_ms(),
            stable_timeout_ms: default_stable_timeout_ms(),
            max_run_time_ms: default_max_run_time_ms(),
            max_attempts: default_max_attempts(),
            load_more_delay_ms: default_load_more_delay_ms(),
        }
    }
}

fn default_min_records() -> usize {
    50
}
fn default_max_records() -> usize {
    4000
}
fn default_scroll_delay_ms() -> u64 {
    1500
}
fn default_stable_timeout_ms() -> u64 {
    20_000
}
fn default_max_run_time_ms() -> u64 {
    600_000
}
fn default_max_attempts() -> u32 {
    100
}
fn default_load_more_delay_ms() -> u64 {
    1000
}

impl Config {
    /// Configured sources plus the built-in futuretools entry, unless the
    /// file overrides it.
    pub fn all_sources(&self) -> BTreeMap<String, SourceConfig> {
        let mut sources = self.sources.clone();
        // Source names are matched case-insensitively, so `[sources.FutureTools]`
        // also replaces the built-in.
        if !sources.keys().any(|k| k.eq_ignore_ascii_case(FUTURETOOLS)) {
            sources.insert(FUTURETOOLS.to_string(), SourceConfig::futuretools());
        }
        sources
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.browser.navigation_timeout_secs == 0 {
        anyhow::bail!("browser.navigation_timeout_secs must be > 0");
    }
    if config.browser.viewport_width == 0 || config.browser.viewport_height == 0 {
        anyhow::bail!("browser viewport dimensions must be > 0");
    }

    for (name, source) in &config.sources {
        if name.trim().is_empty() {
            anyhow::bail!("source names must not be empty");
        }
        source.validate(name)?;
    }

    Ok(())
}
