//! Visit Log Dashboard
//!
//! Backend for a small dashboard that records page visits and serves
//! paginated analytics.
//!
//! # Features
//!
//! - **Bounded log**: only the most recent visits are retained
//! - **All-time counters**: total views and unique visitors survive trimming
//! - **Atomic appends**: insert, count, register and trim commit together
//! - **Two backends**: flat JSON file or SQLite, chosen by configuration
//!
//! # Modules
//!
//! - `types`: Visit records and the stats page
//! - `store`: The visit log store and its backends
//! - `stats`: Pagination and per-address aggregation
//! - `device`: User-agent classification
//! - `api`: Axum router and handlers
//! - `config`: Environment-driven configuration
//! - `utils`: Atomic file writes, timestamps, truncation
//!
//! # Example
//!
//! ```no_run
//! use visit_log::device::UserAgentClassifier;
//! use visit_log::stats::{PageRequest, StatsAggregator};
//! use visit_log::store::{open_store, Backend, StoreConfig};
//! use visit_log::types::{VisitInput, VisitRecord};
//! use visit_log::utils::now_seconds;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = open_store(&StoreConfig::new(Backend::File, "data"))?;
//!
//!     let input = VisitInput {
//!         source_address: "203.0.113.7".to_string(),
//!         user_agent: "Mozilla/5.0 Firefox/121.0".to_string(),
//!         ..Default::default()
//!     };
//!     store.append(VisitRecord::ingest(input, &UserAgentClassifier, now_seconds()))?;
//!
//!     let page = StatsAggregator::new(store.as_ref()).get_stats(PageRequest::default())?;
//!     println!("{} views", page.total_views);
//!
//!     store.close()?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod device;
pub mod init;
pub mod stats;
pub mod store;
pub mod types;
pub mod utils;

pub use config::Config;
pub use stats::{PageRequest, StatsAggregator};
pub use store::{open_store, Backend, StoreConfig, StoreError, StoreResult, VisitStore};
pub use types::{RecentVisit, StatsPage, VisitInput, VisitRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
