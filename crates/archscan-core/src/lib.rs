//! # archscan core
//!
//! IO-free logic shared by the `archscan` binary and library: data models,
//! ARM template parsing, sidecar metadata merging, document assembly, and
//! the [`store::ArchitectureStore`] abstraction with an in-memory backend.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies. Everything
//! here operates on already-fetched `serde_json` values and plain strings.

pub mod arm;
pub mod document;
pub mod metadata;
pub mod models;
pub mod store;
