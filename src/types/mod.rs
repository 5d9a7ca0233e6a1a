//! Data types for the visit log
//!
//! Visit records, ingestion input and the stats page returned to the
//! dashboard.

mod stats;
mod visit;

pub use stats::{RecentVisit, StatsPage};
pub use visit::{
    VisitInput, VisitRecord, MAX_LANGUAGE_LEN, MAX_REFERRER_LEN, MAX_USER_AGENT_LEN,
    UNKNOWN_ADDRESS,
};
