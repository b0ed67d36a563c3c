//! Activity Scanner
//!
//! Pages through one account's activity feed and folds matching events into
//! an [`AccountDelta`]. The feed is assumed newest-first, so the first event
//! older than the window ends the scan without fetching further pages. That
//! ordering is a contract of the upstream service and is not verified here; a
//! feed that violates it is silently undercounted.

use std::collections::HashSet;

use crate::error::AggregationError;
use crate::models::activity::{AccountDelta, ActivityEvent};
use crate::models::window::TimeWindow;
use crate::services::ledger_client::{ActivityQuery, LedgerDataService};

/// Why a scan stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEnd {
    /// Feed exhausted (no continuation token)
    Exhausted,
    /// Reached an event older than the window
    WindowPassed,
    /// Stopped by an upstream or record failure; the delta is partial
    Failed(AggregationError),
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub delta: AccountDelta,
    pub pages_fetched: usize,
    pub end: ScanEnd,
}

impl ScanOutcome {
    pub fn error(&self) -> Option<&AggregationError> {
        match &self.end {
            ScanEnd::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Scan one account. Never fails as a whole: errors end the scan and are
/// reported in [`ScanOutcome::end`] next to the partial delta.
pub async fn scan_account(
    ledger: &dyn LedgerDataService,
    query: &ActivityQuery,
    window: &TimeWindow,
) -> ScanOutcome {
    let mut delta = AccountDelta::new(&query.account);
    let mut pages_fetched = 0;

    let end = scan_pages(ledger, query, window, &mut delta, &mut pages_fetched).await;

    match &end {
        ScanEnd::Failed(e) => tracing::warn!(
            account = %query.account,
            pages = pages_fetched,
            error = %e,
            "Activity scan stopped early, keeping partial delta"
        ),
        _ => tracing::debug!(
            account = %query.account,
            pages = pages_fetched,
            in_count = delta.in_count,
            out_count = delta.out_count,
            end = ?end,
            "Activity scan complete"
        ),
    }

    ScanOutcome {
        delta,
        pages_fetched,
        end,
    }
}

async fn scan_pages(
    ledger: &dyn LedgerDataService,
    query: &ActivityQuery,
    window: &TimeWindow,
    delta: &mut AccountDelta,
    pages_fetched: &mut usize,
) -> ScanEnd {
    let mut continuation: Option<String> = None;
    let mut consumed_tokens: HashSet<String> = HashSet::new();

    loop {
        let page = match ledger.fetch_activity_page(query, continuation.as_deref()).await {
            Ok(page) => page,
            Err(e) => return ScanEnd::Failed(e),
        };
        *pages_fetched += 1;

        for record in &page.items {
            let event = match ActivityEvent::from_record(record, &query.scope.token) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => return ScanEnd::Failed(e),
            };

            if window.is_before(event.timestamp) {
                return ScanEnd::WindowPassed;
            }
            if !window.contains(event.timestamp) || !query.kinds.contains(&event.kind) {
                continue;
            }
            if let Err(e) = delta.record(&event) {
                return ScanEnd::Failed(e);
            }
        }

        match page.continuation {
            None => return ScanEnd::Exhausted,
            Some(token) => {
                if !consumed_tokens.insert(token.clone()) {
                    return ScanEnd::Failed(AggregationError::PaginationLoopDetected {
                        stream: format!("activity of {}", query.account),
                        token,
                    });
                }
                continuation = Some(token);
            }
        }
    }
}
