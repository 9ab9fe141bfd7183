//! Alert monitoring engine.
//!
//! Watches the paginated search API for records matching user-defined alerts,
//! enriches every newly seen record and hands a rendered notification to a
//! transport. The moving parts, leaves first:
//!
//! - [`facets`]: code ↔ label translation and the periodic facet refresh.
//! - [`fetcher`]: concurrency-bounded, retried retrieval of an alert's full key set.
//! - [`diff`]: pure comparison of two key sets.
//! - [`enrich`]: per-record detail lookup and normalization.
//! - [`notify`]: message rendering and the transport port.
//! - [`scheduler`]: polling cadence, the per-alert pipeline and lifecycle checkpoints.
//!
//! Everything persistent goes through the [`store::JsonStore`] port.

pub mod app;
pub mod config;
pub mod diff;
pub mod enrich;
pub mod facets;
pub mod fetcher;
pub mod filter;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod store;
