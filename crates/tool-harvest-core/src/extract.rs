//! Declarative record extraction from an HTML snapshot.
//!
//! A source describes its markup with a [`SelectorConfig`]: one CSS selector
//! per logical field. [`Extractor::extract`] walks every card in the
//! snapshot and produces a [`RawRecord`] for each one that has a name, a
//! description and a usable link. Cards missing any of those are dropped
//! silently; a card whose link cannot be resolved is logged and skipped.
//! Neither ever aborts extraction of the remaining cards.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::models::RawRecord;

/// Errors raised while compiling selectors or extracting a single card.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector for '{field}' ({selector:?}): {message}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        message: String,
    },
    #[error("unsupported link '{href}'")]
    UnsupportedHref { href: String },
    #[error("cannot resolve link '{href}' against '{base}': {source}")]
    InvalidUrl {
        href: String,
        base: String,
        #[source]
        source: url::ParseError,
    },
}

/// Locator expressions for one source, keyed by logical field.
///
/// Only `card`, `name`, `description` and `link` are required. `link` is
/// the element carrying the tool's `href`; when it matches nothing the card
/// element's own `href` is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Scopes card lookup to the first matching element.
    #[serde(default)]
    pub container: Option<String>,
    pub card: String,
    pub name: String,
    pub description: String,
    pub link: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub pricing: Option<String>,
    #[serde(default)]
    pub favorite_count: Option<String>,
    /// "Load more" control, activated by the content loader when present.
    #[serde(default)]
    pub load_more: Option<String>,
}

impl SelectorConfig {
    /// Selector set for the futuretools.io listing.
    pub fn futuretools() -> Self {
        Self {
            container: Some(".collection-list-15.w-dyn-items, .w-dyn-items".to_string()),
            card: ".tool.tool-home.w-dyn-item, div[role=\"listitem\"]".to_string(),
            name: ".tool-item-link---new".to_string(),
            description: ".tool-item-description-box---new".to_string(),
            link: "a.tool-item-new-window---new".to_string(),
            category: Some(".text-block-53".to_string()),
            tags: Some(".text-block-53".to_string()),
            pricing: Some(".pricing, .price, .badge".to_string()),
            favorite_count: Some(".text-block-52.jetboost-item-total-favorites-vd2l".to_string()),
            load_more: Some("button[data-testid=\"load-more\"], .load-more".to_string()),
        }
    }
}

/// [`SelectorConfig`] with every selector parsed.
#[derive(Debug)]
pub struct CompiledSelectors {
    container: Option<Selector>,
    card: Selector,
    name: Selector,
    description: Selector,
    link: Selector,
    category: Option<Selector>,
    tags: Option<Selector>,
    pricing: Option<Selector>,
    favorite_count: Option<Selector>,
}

fn parse_selector(field: &'static str, selector: &str) -> Result<Selector, ExtractError> {
    if selector.trim().is_empty() {
        return Err(ExtractError::InvalidSelector {
            field,
            selector: selector.to_string(),
            message: "selector is empty".to_string(),
        });
    }
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        field,
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn parse_optional(
    field: &'static str,
    selector: &Option<String>,
) -> Result<Option<Selector>, ExtractError> {
    selector
        .as_deref()
        .map(|s| parse_selector(field, s))
        .transpose()
}

impl CompiledSelectors {
    pub fn compile(config: &SelectorConfig) -> Result<Self, ExtractError> {
        // load_more is only consumed by the loader, but a bad one should
        // still fail at startup.
        parse_optional("load_more", &config.load_more)?;

        Ok(Self {
            container: parse_optional("container", &config.container)?,
            card: parse_selector("card", &config.card)?,
            name: parse_selector("name", &config.name)?,
            description: parse_selector("description", &config.description)?,
            link: parse_selector("link", &config.link)?,
            category: parse_optional("category", &config.category)?,
            tags: parse_optional("tags", &config.tags)?,
            pricing: parse_optional("pricing", &config.pricing)?,
            favorite_count: parse_optional("favorite_count", &config.favorite_count)?,
        })
    }
}

/// Pure snapshot → records extractor for one source.
#[derive(Debug)]
pub struct Extractor {
    selectors: CompiledSelectors,
    base_url: String,
    source: String,
}

impl Extractor {
    pub fn new(config: &SelectorConfig, base_url: &str, source: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            selectors: CompiledSelectors::compile(config)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            source: source.to_string(),
        })
    }

    /// Extract every complete card from `html`, in document order.
    pub fn extract(&self, html: &str) -> Vec<RawRecord> {
        let document = Html::parse_document(html);
        let root = match &self.selectors.container {
            Some(sel) => match document.select(sel).next() {
                Some(container) => container,
                None => {
                    tracing::debug!(source = %self.source, "container not found, scanning whole document");
                    document.root_element()
                }
            },
            None => document.root_element(),
        };

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for (index, card) in root.select(&self.selectors.card).enumerate() {
            match self.extract_card(card) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => dropped += 1,
                Err(e) => {
                    dropped += 1;
                    tracing::warn!(source = %self.source, card = index, "skipping card: {e}");
                }
            }
        }

        tracing::debug!(
            source = %self.source,
            extracted = records.len(),
            dropped,
            "extraction finished"
        );
        records
    }

    fn extract_card(&self, card: ElementRef<'_>) -> Result<Option<RawRecord>, ExtractError> {
        let sel = &self.selectors;

        let name = first_text(card, &sel.name);
        let description = first_text(card, &sel.description);
        let href = card
            .select(&sel.link)
            .find_map(|el| el.value().attr("href"))
            .or_else(|| card.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default();

        if name.is_empty() || description.is_empty() || href.is_empty() {
            return Ok(None);
        }

        let url = resolve_href(&self.base_url, href)?;

        let tags = match &sel.tags {
            Some(tag_sel) => dedup_texts(card.select(tag_sel).map(element_text)),
            None => Vec::new(),
        };

        let optional_text = |s: &Option<Selector>| s.as_ref().map(|s| first_text(card, s)).unwrap_or_default();

        let favorite_count = sel
            .favorite_count
            .as_ref()
            .and_then(|s| parse_count(&first_text(card, s)));

        Ok(Some(RawRecord {
            name,
            description,
            url,
            tags,
            raw_category: optional_text(&sel.category),
            raw_pricing: optional_text(&sel.pricing),
            favorite_count,
            source: self.source.clone(),
        }))
    }
}

/// Text content with whitespace runs collapsed to one space and trimmed.
fn element_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(card: ElementRef<'_>, sel: &Selector) -> String {
    card.select(sel).next().map(element_text).unwrap_or_default()
}

/// Drop empty and repeated values, keeping first-seen order.
fn dedup_texts(texts: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for text in texts {
        if !text.is_empty() && !out.contains(&text) {
            out.push(text);
        }
    }
    out
}

/// First number in a count label: `"1,234"`, `"42 saves"`, `"1.2k"`.
///
/// A `.` is only accepted with a `k`/`m` suffix; `"1.204"` is ambiguous
/// and yields `None`.
fn parse_count(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    let start = lower.find(|c: char| c.is_ascii_digit())?;
    let rest = &lower[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(rest.len());
    let number: String = rest[..end].chars().filter(|c| *c != ',').collect();
    let number = number.trim_end_matches('.');

    let mut suffix = rest[end..].chars();
    let multiplier = match (suffix.next(), suffix.next()) {
        (Some('k'), next) if !next.is_some_and(char::is_alphabetic) => Some(1_000.0),
        (Some('m'), next) if !next.is_some_and(char::is_alphabetic) => Some(1_000_000.0),
        _ => None,
    };

    match multiplier {
        Some(multiplier) => {
            let value: f64 = number.parse().ok()?;
            Some((value * multiplier).round() as i64)
        }
        None if number.contains('.') => None,
        None => number.parse().ok(),
    }
}

/// Resolve a card link to an absolute http(s) URL.
///
/// Absolute links are kept verbatim. `//host/x` takes the base scheme.
/// Anything else is appended to the base as a path, so `/x` and `x` both
/// become `<base>/x`. Built URLs are returned in serialized form, so
/// `/my tool` and `/my%20tool` resolve to the same key.
pub fn resolve_href(base_url: &str, href: &str) -> Result<String, ExtractError> {
    let href = href.trim();
    let base = base_url.trim_end_matches('/');

    let verbatim = href.starts_with('#') || has_scheme(href);
    let candidate = if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.split("://").next().unwrap_or("https");
        format!("{scheme}://{rest}")
    } else if verbatim {
        href.to_string()
    } else {
        format!("{}/{}", base, href.trim_start_matches('/'))
    };

    let parsed = Url::parse(&candidate).map_err(|source| ExtractError::InvalidUrl {
        href: href.to_string(),
        base: base.to_string(),
        source,
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => {
            Ok(if verbatim { candidate } else { parsed.to_string() })
        }
        _ => Err(ExtractError::UnsupportedHref {
            href: href.to_string(),
        }),
    }
}

/// True for `scheme:` prefixes per RFC 3986 (alpha, then alnum/`+-.`).
fn has_scheme(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
