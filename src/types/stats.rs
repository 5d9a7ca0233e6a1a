//! Stats response types

use serde::{Deserialize, Serialize};

use super::VisitRecord;

/// A retained visit annotated with how often its address appears in the
/// retained window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentVisit {
    #[serde(flatten)]
    pub visit: VisitRecord,
    #[serde(rename = "visitCount")]
    pub visit_count: u64,
}

/// One page of dashboard statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPage {
    /// All-time number of appended visits
    pub total_views: u64,
    /// All-time number of distinct source addresses
    pub unique_visitors: u64,
    /// Most-recent-first slice of the retained log
    pub recent_visits: Vec<RecentVisit>,
    pub has_more: bool,
}
