//! # Tool Harvest Core
//!
//! Shared, runtime-free logic for Tool Harvest: the record model, the
//! declarative extractor, pricing normalization, the storage abstraction,
//! and upsert reconciliation.
//!
//! This crate contains no tokio, sqlx, browser automation, or filesystem
//! I/O. Everything here operates on values (an HTML snapshot string, a
//! slice of parsed tools, a `&dyn ToolStore`) so it can be tested without
//! a browser or a database.

pub mod extract;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod store;
