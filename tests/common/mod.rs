use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use holder_activity::error::{AggregationError, AggregationResult};
use holder_activity::models::activity::{
    ActivityRecord, HolderRecord, Page, TokenInfoRecord, TokenScope, normalize_address,
};
use holder_activity::services::ledger_client::{ActivityQuery, LedgerDataService};

pub const TOKEN: &str = "0x00000000000000000000000000000000000000aa";

/// In-memory ledger data service.
///
/// Holders are paged with offsets "h{index}", activity with "a{index}".
/// Each account's activity is served newest-first.
#[allow(dead_code)]
pub struct FixtureLedger {
    holders: Vec<HolderRecord>,
    holder_page_size: usize,
    repeat_holder_offset: bool,
    activity: HashMap<String, Vec<(DateTime<Utc>, ActivityRecord)>>,
    fail_after_pages: HashMap<String, usize>,
    token_info: Option<Vec<TokenInfoRecord>>,
    pub holder_requests: Mutex<usize>,
    pub activity_requests: Mutex<HashMap<String, usize>>,
}

#[allow(dead_code)]
impl FixtureLedger {
    pub fn new() -> Self {
        Self {
            holders: Vec::new(),
            holder_page_size: 100,
            repeat_holder_offset: false,
            activity: HashMap::new(),
            fail_after_pages: HashMap::new(),
            token_info: Some(vec![TokenInfoRecord {
                decimals: Some(6),
                symbol: Some("FIX".to_string()),
                name: Some("Fixture Token".to_string()),
                logo: None,
            }]),
            holder_requests: Mutex::new(0),
            activity_requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn holder(mut self, address: &str, balance: u64) -> Self {
        self.holders.push(HolderRecord {
            wallet_address: address.to_string(),
            balance: balance.to_string(),
        });
        self
    }

    pub fn holder_page_size(mut self, size: usize) -> Self {
        self.holder_page_size = size.max(1);
        self
    }

    /// Every holders page after the first points back at the same offset
    pub fn repeat_holder_offset(mut self) -> Self {
        self.repeat_holder_offset = true;
        self
    }

    /// Record `from` → `to`: a send in `from`'s feed and a receive in `to`'s feed
    pub fn transfer(self, from: &str, to: &str, amount: u64, at: DateTime<Utc>) -> Self {
        let record = |kind: &str| ActivityRecord {
            block_time: at.to_rfc3339(),
            activity_type: kind.to_string(),
            asset_type: Some("erc20".to_string()),
            token_address: Some(TOKEN.to_string()),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            value: Some(amount.to_string()),
            ..Default::default()
        };
        let send = record("send");
        let receive = record("receive");
        self.event(from, at, send).event(to, at, receive)
    }

    pub fn event(mut self, account: &str, at: DateTime<Utc>, record: ActivityRecord) -> Self {
        self.activity
            .entry(normalize_address(account))
            .or_default()
            .push((at, record));
        self
    }

    /// Serve `pages` activity pages for `account`, then fail with an upstream error
    pub fn fail_account_after(mut self, account: &str, pages: usize) -> Self {
        self.fail_after_pages.insert(normalize_address(account), pages);
        self
    }

    pub fn without_token_info(mut self) -> Self {
        self.token_info = None;
        self
    }

    pub fn activity_requests_for(&self, account: &str) -> usize {
        self.activity_requests
            .lock()
            .get(&normalize_address(account))
            .copied()
            .unwrap_or(0)
    }
}

fn offset_index(continuation: Option<&str>, prefix: char) -> AggregationResult<usize> {
    match continuation {
        None => Ok(0),
        Some(token) => token
            .strip_prefix(prefix)
            .and_then(|index| index.parse().ok())
            .ok_or_else(|| AggregationError::UpstreamError(format!("400 bad offset '{}'", token))),
    }
}

#[async_trait]
impl LedgerDataService for FixtureLedger {
    async fn fetch_holders_page(
        &self,
        _scope: &TokenScope,
        _page_size: u32,
        continuation: Option<&str>,
    ) -> AggregationResult<Page<HolderRecord>> {
        *self.holder_requests.lock() += 1;

        let start = offset_index(continuation, 'h')?;
        let end = (start + self.holder_page_size).min(self.holders.len());
        let items = self.holders.get(start..end).unwrap_or_default().to_vec();

        let next = if self.repeat_holder_offset {
            Some("h1".to_string())
        } else if end < self.holders.len() {
            Some(format!("h{}", end))
        } else {
            None
        };

        Ok(Page::new(items, next))
    }

    async fn fetch_activity_page(
        &self,
        query: &ActivityQuery,
        continuation: Option<&str>,
    ) -> AggregationResult<Page<ActivityRecord>> {
        let served = {
            let mut requests = self.activity_requests.lock();
            let count = requests.entry(query.account.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        if let Some(limit) = self.fail_after_pages.get(&query.account) {
            if served >= *limit {
                return Err(AggregationError::UpstreamError(format!(
                    "503 Service Unavailable for {}",
                    query.account
                )));
            }
        }

        // give other workers a chance to interleave
        tokio::task::yield_now().await;

        let mut events = self.activity.get(&query.account).cloned().unwrap_or_default();
        events.sort_by(|a, b| b.0.cmp(&a.0));

        let page_size = (query.page_size as usize).max(1);
        let start = offset_index(continuation, 'a')?;
        let end = (start + page_size).min(events.len());
        let items = events
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|(_, record)| record.clone())
            .collect();
        let next = (end < events.len()).then(|| format!("a{}", end));

        Ok(Page::new(items, next))
    }

    async fn fetch_token_info(&self, _scope: &TokenScope) -> AggregationResult<Vec<TokenInfoRecord>> {
        self.token_info
            .clone()
            .ok_or_else(|| AggregationError::UpstreamError("404 token not found".to_string()))
    }
}

/// Distinct account address for index `i`
#[allow(dead_code)]
pub fn account(i: usize) -> String {
    format!("0x{:040x}", 0x1000 + i)
}

