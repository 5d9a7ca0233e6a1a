//! Stats Aggregator
//!
//! Read-side views over a [`StoreSnapshot`]: all-time totals plus a
//! most-recent-first page of the retained log. `visitCount` on each page
//! entry counts occurrences within the retained window only, while
//! `uniqueVisitors` is all-time.

use std::collections::HashMap;

use crate::store::{StoreResult, StoreSnapshot, VisitStore};
use crate::types::{RecentVisit, StatsPage};

/// Page size used when none (or an unusable one) is requested
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Largest page size a caller may ask for
pub const MAX_PAGE_SIZE: usize = 50;

/// Normalized pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: usize,
    /// Entries per page, within `1..=MAX_PAGE_SIZE`
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp raw values: `page >= 1`, `limit` in `[1, MAX_PAGE_SIZE]`
    ///
    /// Zero counts as "not given" and falls back to the default.
    pub fn new(page: i64, limit: i64) -> Self {
        let page = if page == 0 { 1 } else { page.max(1) };
        let limit = if limit == 0 {
            DEFAULT_PAGE_SIZE as i64
        } else {
            limit.clamp(1, MAX_PAGE_SIZE as i64)
        };

        Self {
            page: usize::try_from(page).unwrap_or(usize::MAX),
            limit: limit as usize,
        }
    }

    /// Build from raw query-string values; anything non-numeric uses the default
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0);
        Self::new(parse(page), parse(limit))
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Build one stats page from a snapshot
pub fn build_page(snapshot: &StoreSnapshot, request: PageRequest) -> StatsPage {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for visit in &snapshot.visits {
        *counts.entry(visit.source_address.as_str()).or_insert(0) += 1;
    }

    let offset = request.offset();
    let recent_visits: Vec<RecentVisit> = snapshot
        .visits
        .iter()
        .rev()
        .skip(offset)
        .take(request.limit)
        .map(|visit| RecentVisit {
            visit_count: counts.get(visit.source_address.as_str()).copied().unwrap_or(1),
            visit: visit.clone(),
        })
        .collect();

    let has_more = offset.saturating_add(recent_visits.len()) < snapshot.visits.len();

    StatsPage {
        total_views: snapshot.total_views,
        unique_visitors: snapshot.unique_visitors,
        recent_visits,
        has_more,
    }
}

/// Stats queries over a visit store
pub struct StatsAggregator<'a> {
    store: &'a dyn VisitStore,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(store: &'a dyn VisitStore) -> Self {
        Self { store }
    }

    /// Totals plus the requested page of recent visits
    ///
    /// Fails when the store cannot produce a snapshot; never returns a
    /// partially populated page.
    pub fn get_stats(&self, request: PageRequest) -> StoreResult<StatsPage> {
        let snapshot = self.store.snapshot()?;
        Ok(build_page(&snapshot, request))
    }
}
