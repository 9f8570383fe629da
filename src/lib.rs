//! # tap-shipstation
//!
//! An incremental extraction tap for the ShipStation shipping-management
//! REST API. Each logical data source ("stream") is turned into a sequence
//! of authenticated GET requests with pagination, rate-limit handling, and
//! daily time-window partitioning; every fetched record is forwarded to a
//! record sink in fetch order, and a resumable bookmark is persisted after
//! each completed window so an interrupted run resumes with at most one
//! window of duplicate work.
//!
//! ## Features
//!
//! - **Incremental Sync**: Daily time windows bounded by a persisted bookmark
//! - **Rate Limiting**: Honors `X-Rate-Limit-Remaining`/`X-Rate-Limit-Reset`
//!   headers and absorbs HTTP 429 throttling with in-place retry
//! - **Resume Capability**: Bookmark state flushed durably after every window
//! - **Catalog Discovery**: Stream metadata and record schemas for selection
//! - **Streaming Output**: Singer-style SCHEMA/RECORD/STATE messages, emitted
//!   record by record without buffering
//!
//! ## Quick Start
//!
//! ```no_run
//! use tap_shipstation::client::{ReqwestTransport, ShipStationClient};
//! use tap_shipstation::config::Config;
//! use tap_shipstation::output::MessageWriter;
//! use tap_shipstation::state::SyncState;
//! use tap_shipstation::sync::SyncRunner;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file(Path::new("config.json"))?;
//! let client = ShipStationClient::new(Arc::new(ReqwestTransport::new(&config)?));
//! let state = SyncState::load_or_default(Path::new("state.json"))?;
//! let sink = MessageWriter::stdout();
//!
//! let mut runner = SyncRunner::new(client, config, state, sink)
//!     .with_state_path("state.json".into());
//! runner.sync(tap_shipstation::streams::all_streams()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - Rate-limited HTTP client and lazy paginator
//! - [`windows`] - Daily time-window partitioner for incremental extraction
//! - [`streams`] - Stream definitions, parameter builders, embedded schemas
//! - [`catalog`] - Catalog discovery and selected-stream resolution
//! - [`state`] - Persisted bookmark map with atomic durable flush
//! - [`output`] - Record sink trait and singer-style message writer
//! - [`sync`] - Sync orchestrator walking streams, windows, and pages

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Catalog discovery and stream selection
pub mod catalog;

/// Rate-limited HTTP client and paginator
pub mod client;

/// CLI command implementations
pub mod cli;

/// Tap configuration
pub mod config;

/// Record sink trait and singer-style message output
pub mod output;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Persisted sync state (bookmarks)
pub mod state;

/// Stream definitions and parameter builders
pub mod streams;

/// Sync orchestration
pub mod sync;

/// Time-window partitioning
pub mod windows;

// Re-export commonly used types
pub use client::ShipStationClient;
pub use state::SyncState;
pub use streams::StreamDef;
