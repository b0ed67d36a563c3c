//! Snapshot Loader
//!
//! Streams every holder balance of a token, following continuation tokens
//! until the upstream stops returning one or the optional cap is reached.
//! Any failure ends the stream; the loader never retries.

use futures_util::stream::{self, Stream, StreamExt, TryStreamExt};
use std::collections::HashSet;

use crate::error::{AggregationError, AggregationResult};
use crate::models::activity::{AccountSnapshot, TokenScope};
use crate::services::ledger_client::LedgerDataService;

pub const DEFAULT_HOLDERS_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct SnapshotLoaderOptions {
    pub page_size: u32,
    pub max_holders: Option<usize>,
}

impl Default for SnapshotLoaderOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_HOLDERS_PAGE_SIZE,
            max_holders: None,
        }
    }
}

struct LoaderState<'a> {
    ledger: &'a dyn LedgerDataService,
    scope: &'a TokenScope,
    options: SnapshotLoaderOptions,
    continuation: Option<String>,
    consumed_tokens: HashSet<String>,
    seen_addresses: HashSet<String>,
    emitted: usize,
    finished: bool,
}

impl LoaderState<'_> {
    fn cap_reached(&self) -> bool {
        self.options.max_holders.is_some_and(|max| self.emitted >= max)
    }

    /// Fetch the next page and convert it; sets `finished` on the last batch
    async fn next_batch(&mut self) -> Vec<AggregationResult<AccountSnapshot>> {
        if self.cap_reached() {
            self.finished = true;
            return Vec::new();
        }

        let page = match self
            .ledger
            .fetch_holders_page(self.scope, self.options.page_size, self.continuation.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return vec![Err(e)];
            }
        };

        let mut batch = Vec::with_capacity(page.items.len());

        for record in &page.items {
            if self.cap_reached() {
                self.finished = true;
                return batch;
            }

            match AccountSnapshot::try_from(record) {
                Ok(snapshot) => {
                    if self.seen_addresses.insert(snapshot.address.clone()) {
                        self.emitted += 1;
                        batch.push(Ok(snapshot));
                    }
                }
                Err(e) => {
                    self.finished = true;
                    batch.push(Err(e));
                    return batch;
                }
            }
        }

        match page.continuation {
            None => self.finished = true,
            Some(token) => {
                if !self.consumed_tokens.insert(token.clone()) {
                    tracing::error!(token = %self.scope.token, offset = %token, "Holders pagination loop detected");
                    self.finished = true;
                    batch.push(Err(AggregationError::PaginationLoopDetected {
                        stream: format!("holders of {}", self.scope.token),
                        token,
                    }));
                } else {
                    self.continuation = Some(token);
                }
            }
        }

        if self.cap_reached() {
            self.finished = true;
        }

        batch
    }
}

/// Lazy, finite, non-restartable sequence of holder snapshots
pub fn snapshot_stream<'a>(
    ledger: &'a dyn LedgerDataService,
    scope: &'a TokenScope,
    options: SnapshotLoaderOptions,
) -> impl Stream<Item = AggregationResult<AccountSnapshot>> + Send + 'a {
    let state = LoaderState {
        ledger,
        scope,
        options,
        continuation: None,
        consumed_tokens: HashSet::new(),
        seen_addresses: HashSet::new(),
        emitted: 0,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        let batch = state.next_batch().await;
        Some((stream::iter(batch), state))
    })
    .flatten()
}

/// Collect the whole snapshot sequence, failing on the first error
pub async fn load_snapshots(
    ledger: &dyn LedgerDataService,
    scope: &TokenScope,
    options: SnapshotLoaderOptions,
) -> AggregationResult<Vec<AccountSnapshot>> {
    tracing::info!(
        chain_id = scope.chain_id,
        token = %scope.token,
        page_size = options.page_size,
        max_holders = ?options.max_holders,
        "Loading holder snapshots"
    );

    let snapshots: Vec<AccountSnapshot> = snapshot_stream(ledger, scope, options).try_collect().await?;

    tracing::info!(token = %scope.token, holders = snapshots.len(), "Loaded holder snapshots");

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::{ActivityRecord, HolderRecord, Page, TokenInfoRecord};
    use crate::services::ledger_client::ActivityQuery;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Holder pages keyed by the offset that requests them ("" for the first page)
    struct PagedHolders {
        pages: HashMap<String, (Vec<(&'static str, &'static str)>, Option<&'static str>)>,
        requests: Mutex<Vec<Option<String>>>,
    }

    impl PagedHolders {
        fn new(pages: Vec<(&'static str, Vec<(&'static str, &'static str)>, Option<&'static str>)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(offset, holders, next)| (offset.to_string(), (holders, next)))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerDataService for PagedHolders {
        async fn fetch_holders_page(
            &self,
            _scope: &TokenScope,
            _page_size: u32,
            continuation: Option<&str>,
        ) -> AggregationResult<Page<HolderRecord>> {
            self.requests.lock().push(continuation.map(str::to_string));
            let key = continuation.unwrap_or("");
            let (holders, next) = self
                .pages
                .get(key)
                .ok_or_else(|| AggregationError::UpstreamError(format!("404 for offset '{}'", key)))?;

            Ok(Page::new(
                holders
                    .iter()
                    .map(|(address, balance)| HolderRecord {
                        wallet_address: address.to_string(),
                        balance: balance.to_string(),
                    })
                    .collect(),
                next.map(str::to_string),
            ))
        }

        async fn fetch_activity_page(
            &self,
            _query: &ActivityQuery,
            _continuation: Option<&str>,
        ) -> AggregationResult<Page<ActivityRecord>> {
            Ok(Page::new(vec![], None))
        }

        async fn fetch_token_info(&self, _scope: &TokenScope) -> AggregationResult<Vec<TokenInfoRecord>> {
            Ok(vec![])
        }
    }

    fn scope() -> TokenScope {
        TokenScope::new(1, "0xtoken")
    }

    #[tokio::test]
    async fn test_follows_continuation_until_absent() {
        let ledger = PagedHolders::new(vec![
            ("", vec![("0xA", "100"), ("0xB", "50")], Some("p2")),
            ("p2", vec![("0xC", "10")], Some("p3")),
            ("p3", vec![("0xD", "1")], None),
        ]);

        let snapshots = load_snapshots(&ledger, &scope(), SnapshotLoaderOptions::default())
            .await
            .unwrap();

        let addresses: Vec<_> = snapshots.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, vec!["0xa", "0xb", "0xc", "0xd"]);
        assert_eq!(
            *ledger.requests.lock(),
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_repeated_token_is_a_pagination_loop() {
        let ledger = PagedHolders::new(vec![
            ("", vec![("0xA", "100")], Some("p2")),
            ("p2", vec![("0xB", "50")], Some("p2")),
        ]);

        let err = load_snapshots(&ledger, &scope(), SnapshotLoaderOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AggregationError::PaginationLoopDetected { ref token, .. } if token == "p2"));
        // "p2" is requested exactly once
        assert_eq!(ledger.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_max_holders_stops_fetching() {
        let ledger = PagedHolders::new(vec![
            ("", vec![("0xA", "100"), ("0xB", "50")], Some("p2")),
            ("p2", vec![("0xC", "10"), ("0xD", "5")], Some("p3")),
            ("p3", vec![("0xE", "1")], None),
        ]);

        let options = SnapshotLoaderOptions {
            page_size: 2,
            max_holders: Some(3),
        };
        let snapshots = load_snapshots(&ledger, &scope(), options).await.unwrap();

        assert_eq!(snapshots.len(), 3);
        assert_eq!(ledger.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_terminal() {
        let ledger = PagedHolders::new(vec![("", vec![("0xA", "100")], Some("missing"))]);

        let err = load_snapshots(&ledger, &scope(), SnapshotLoaderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::UpstreamError(_)));
    }

    #[tokio::test]
    async fn test_malformed_balance_is_terminal() {
        let ledger = PagedHolders::new(vec![
            ("", vec![("0xA", "100"), ("0xB", "not-a-number")], Some("p2")),
            ("p2", vec![("0xC", "10")], None),
        ]);

        let err = load_snapshots(&ledger, &scope(), SnapshotLoaderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::MalformedRecord(_)));
        assert_eq!(ledger.requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_is_lazy_and_deduplicates() {
        let ledger = PagedHolders::new(vec![
            ("", vec![("0xA", "100"), ("0xa", "100")], Some("p2")),
            ("p2", vec![("0xB", "50")], None),
        ]);
        let scope = scope();

        let mut stream = Box::pin(snapshot_stream(&ledger, &scope, SnapshotLoaderOptions::default()));
        assert!(ledger.requests.lock().is_empty());

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.address, "0xa");
        assert_eq!(ledger.requests.lock().len(), 1);

        let rest: Vec<_> = stream.map(|r| r.unwrap().address).collect().await;
        assert_eq!(rest, vec!["0xb".to_string()]);
    }
}
