//! # Document Insights Dashboard Service
//!
//! ## Overview
//! This library implements a document mentions dashboard: users maintain a
//! list of search terms, and the service reports how often each term appears
//! in a table of ingested documents, bucketed by date with drill-down to the
//! matching rows and CSV export.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `store`: SQLite persistence and schema migrations
//! - `terms`: CRUD for user-maintained search terms
//! - `aggregate`: the bucketed mention-count query over the documents table
//! - `analytics`: rolling trend and 30-day change derived from bucket series
//! - `export`: CSV serialization of the export projection
//! - `api`: REST endpoints consumed by the dashboard
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: search terms, date granularity, optional date ranges
//! - **Output**: contiguous zero-filled bucket series, document rows,
//!   derived trend analytics, CSV exports
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use document_insights::{Aggregator, AggregateQuery, Config, Granularity, Store};
//! use document_insights::aggregate::{MatchField, Projection};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let store = Arc::new(Store::open(config.database.db_path.clone())?);
//!     let aggregator = Aggregator::new(store, config.query.clone());
//!     let result = aggregator.run(&AggregateQuery {
//!         terms: vec!["audit".to_string()],
//!         granularity: Granularity::Month,
//!         range: None,
//!         match_field: MatchField::Text,
//!         projection: Projection::Display,
//!     })?;
//!     println!("{} buckets", result.buckets.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod aggregate;
pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod export;
pub mod store;
pub mod terms;

// Re-exports for convenience
pub use aggregate::{AggregateQuery, AggregateResult, Aggregator, Bucket, Granularity};
pub use config::Config;
pub use errors::{DashboardError, Result};
pub use store::Store;
pub use terms::SearchTerm;

use std::sync::Arc;

/// Application state shared across components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub store: Arc<store::Store>,
    pub aggregator: Arc<aggregate::Aggregator>,
}
