//! # archscan
//!
//! Discovers ARM and Bicep quickstart templates in GitHub repositories and
//! indexes them as architecture records.
//!
//! For each configured source (`owner/repo[:subdir]`) archscan finds
//! candidate template files, picks the template in each quickstart
//! directory, extracts the declared resource types and parameter/output
//! names, merges the sidecar `metadata.json`, and upserts one document per
//! template into SQLite. An HTTP API lists stored documents and triggers
//! new runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ Locator  │──▶│ Resolver │──▶│ ARM parse│──▶│  SQLite  │
//! │search/walk│  │ ARM/Bicep│   │ + sidecar│   │  store   │
//! └────┬─────┘   └────┬─────┘   └──────────┘   └────┬─────┘
//!      └──── GitHub contents + search API           │
//!                                  ┌────────────────┤
//!                                  ▼                ▼
//!                             ┌──────────┐     ┌──────────┐
//!                             │   CLI    │     │   HTTP   │
//!                             └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! archscan init                                   # create database
//! archscan sources                                # check configured sources
//! archscan scrape --limit 10 --save               # discover and store
//! archscan list --q web --sort-by resource_count  # query the store
//! archscan serve                                  # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`error`] | Pipeline error type |
//! | [`github`] | HTTP capability and GitHub API client |
//! | [`fetcher`] | Repository content retrieval and decoding |
//! | [`locator`] | Code search and directory walk strategies |
//! | [`resolver`] | Template selection per directory |
//! | [`pipeline`] | Multi-source discovery runs |
//! | [`persist`] | Batch upsert into a store |
//! | [`sqlite_store`] | SQLite store backend |
//! | [`server`] | HTTP API |
//! | [`mock`] | In-memory GitHub for tests |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! Parsing, metadata merging, and the store trait live in the IO-free
//! `archscan-core` crate, re-exported here as [`core`].

pub use archscan_core as core;

pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod github;
pub mod list;
pub mod locator;
pub mod migrate;
pub mod mock;
pub mod persist;
pub mod pipeline;
pub mod resolver;
pub mod scrape;
pub mod server;
pub mod sources;
pub mod sqlite_store;
