//! # Tool Harvest
//!
//! Crawls AI tool directory listings into a local SQLite catalog.
//!
//! A run drives a headless browser through an infinitely scrolling
//! listing until it stops growing, extracts one record per card with
//! declarative CSS selectors, maps free-text pricing onto a fixed set,
//! and upserts the result keyed by tool URL. Re-running a crawl never
//! duplicates a tool.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐   ┌──────────┐
//! │   Source    │──▶│    Loader    │──▶│ Extract +     │──▶│  SQLite   │
//! │ browser/file│   │ scroll/settle│   │ normalize     │   │  upsert   │
//! └─────────────┘   └──────────────┘   └───────────────┘   └────┬─────┘
//!                                                              │
//!                                        ┌─────────────────────┤
//!                                        ▼                     ▼
//!                                   ┌──────────┐         ┌──────────┐
//!                                   │   CLI    │         │   HTTP   │
//!                                   │(harvest) │         │  (axum)  │
//!                                   └──────────┘         └──────────┘
//! ```
//!
//! Runtime-free pieces (models, extraction, pricing, reconciliation and
//! the storage trait) live in the `tool-harvest-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the storage trait |
//! | [`loader`] | Scroll-until-stable convergence loop |
//! | [`browser`] | Chromium session management |
//! | [`sources`] | Source trait and registry |
//! | [`source_browser`] | Live listing via Chromium |
//! | [`source_file`] | Saved HTML listing |
//! | [`crawl`] | Run orchestration |
//! | [`demo`] | Bundled demo dataset |
//! | [`stats`] | Catalog statistics |
//! | [`list`] | Filtered listing |
//! | [`get`] | Single tool lookup |
//! | [`clear`] | Catalog wipe |
//! | [`server`] | Read-only HTTP API |

pub mod browser;
pub mod clear;
pub mod config;
pub mod crawl;
pub mod db;
pub mod demo;
pub mod get;
pub mod list;
pub mod loader;
pub mod migrate;
pub mod server;
pub mod source_browser;
pub mod source_file;
pub mod sources;
pub mod sqlite_store;
pub mod stats;
