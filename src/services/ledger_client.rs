use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AggregationError, AggregationResult};
use crate::models::activity::{
    ActivityRecord, ActivityResponse, EventKind, HolderRecord, HoldersResponse, Page, TokenInfoRecord,
    TokenInfoResponse, TokenScope, normalize_address,
};

/// Per-account activity query
#[derive(Debug, Clone)]
pub struct ActivityQuery {
    pub account: String,
    pub scope: TokenScope,
    pub kinds: Vec<EventKind>,
    pub page_size: u32,
}

impl ActivityQuery {
    pub fn new(account: &str, scope: &TokenScope, kinds: &[EventKind], page_size: u32) -> Self {
        Self {
            account: normalize_address(account),
            scope: scope.clone(),
            kinds: kinds.to_vec(),
            page_size,
        }
    }

    /// Comma-separated upstream `activity_type` filter, swap listed once
    pub fn activity_type_param(&self) -> String {
        let mut types: Vec<&str> = Vec::new();
        for kind in &self.kinds {
            let name = kind.upstream_type();
            if !types.contains(&name) {
                types.push(name);
            }
        }
        types.join(",")
    }
}

/// Upstream source of holder snapshots, account activity and asset metadata.
///
/// Events returned by `fetch_activity_page` must be newest-first: the scanner
/// stops an account at the first event older than the window.
#[async_trait]
pub trait LedgerDataService: Send + Sync {
    async fn fetch_holders_page(
        &self,
        scope: &TokenScope,
        page_size: u32,
        continuation: Option<&str>,
    ) -> AggregationResult<Page<HolderRecord>>;

    async fn fetch_activity_page(
        &self,
        query: &ActivityQuery,
        continuation: Option<&str>,
    ) -> AggregationResult<Page<ActivityRecord>>;

    async fn fetch_token_info(&self, scope: &TokenScope) -> AggregationResult<Vec<TokenInfoRecord>>;
}

/// Ledger data service client for the Sim API (directly or through a caching proxy)
#[derive(Clone)]
pub struct SimLedgerClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    token_info_cache: Arc<Cache<TokenScope, Vec<TokenInfoRecord>>>,
}

impl SimLedgerClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
        token_info_ttl: Duration,
    ) -> AggregationResult<Self> {
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(token_info_ttl)
            .build();

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_info_cache: Arc::new(cache),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AggregationResult<T> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(query);

        if let Some(api_key) = &self.api_key {
            request = request.header("X-API-Key", api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AggregationError::UpstreamError(format!(
                "{} returned {}: {}",
                path, status, error_text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AggregationError::MalformedRecord(format!("{}: {}", path, e)))
    }
}

fn with_offset(mut query: Vec<(&'static str, String)>, continuation: Option<&str>) -> Vec<(&'static str, String)> {
    if let Some(offset) = continuation {
        query.push(("offset", offset.to_string()));
    }
    query
}

#[async_trait]
impl LedgerDataService for SimLedgerClient {
    async fn fetch_holders_page(
        &self,
        scope: &TokenScope,
        page_size: u32,
        continuation: Option<&str>,
    ) -> AggregationResult<Page<HolderRecord>> {
        let path = format!("/evm/token-holders/{}/{}", scope.chain_id, scope.token);
        let query = with_offset(vec![("limit", page_size.to_string())], continuation);

        let data: HoldersResponse = self.get_json(&path, &query).await?;

        tracing::debug!(
            token = %scope.token,
            holders = data.holders.len(),
            has_next = data.next_offset.is_some(),
            "Fetched holders page"
        );

        Ok(Page::new(data.holders, data.next_offset))
    }

    async fn fetch_activity_page(
        &self,
        query: &ActivityQuery,
        continuation: Option<&str>,
    ) -> AggregationResult<Page<ActivityRecord>> {
        let path = format!("/evm/activity/{}", query.account);
        let params = with_offset(
            vec![
                ("chain_ids", query.scope.chain_id.to_string()),
                ("token_address", query.scope.token.clone()),
                ("activity_type", query.activity_type_param()),
                ("limit", query.page_size.to_string()),
            ],
            continuation,
        );

        let data: ActivityResponse = self.get_json(&path, &params).await?;

        tracing::debug!(
            account = %query.account,
            events = data.activity.len(),
            has_next = data.next_offset.is_some(),
            "Fetched activity page"
        );

        Ok(Page::new(data.activity, data.next_offset))
    }

    async fn fetch_token_info(&self, scope: &TokenScope) -> AggregationResult<Vec<TokenInfoRecord>> {
        if let Some(cached) = self.token_info_cache.get(scope).await {
            tracing::debug!("Cache hit for token info {}", scope.token);
            return Ok(cached);
        }

        let path = format!("/evm/token-info/{}", scope.token);
        let data: TokenInfoResponse = self
            .get_json(&path, &[("chain_ids", scope.chain_id.to_string())])
            .await?;

        self.token_info_cache
            .insert(scope.clone(), data.tokens.clone())
            .await;

        Ok(data.tokens)
    }
}
