//! Holder activity report
//!
//! Window Resolver → Snapshot Loader → Aggregation Engine → Report Merger.
//! Window and snapshot failures abort the report; per-account scan failures
//! only show up in `skipped_accounts`.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::AggregationResult;
use crate::models::activity::{EventKind, TokenScope};
use crate::models::report::{ActivityReport, AssetMetadata};
use crate::models::window::WindowRequest;
use crate::services::aggregation_engine::{
    AggregationEngine, DEFAULT_ACTIVITY_PAGE_SIZE, DEFAULT_WORKERS, EngineConfig, Progress,
};
use crate::services::ledger_client::LedgerDataService;
use crate::services::report_merger::merge_report;
use crate::services::snapshot_loader::{DEFAULT_HOLDERS_PAGE_SIZE, SnapshotLoaderOptions, load_snapshots};
use crate::services::window::resolve_window;

/// Tunables shared by every report run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub workers: usize,
    pub holders_page_size: u32,
    pub activity_page_size: u32,
    pub max_holders: Option<usize>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            holders_page_size: DEFAULT_HOLDERS_PAGE_SIZE,
            activity_page_size: DEFAULT_ACTIVITY_PAGE_SIZE,
            max_holders: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub scope: TokenScope,
    pub window: WindowRequest,
    pub kinds: Vec<EventKind>,
    pub active_only: bool,
}

impl ReportRequest {
    pub fn new(scope: TokenScope, window: WindowRequest) -> Self {
        Self {
            scope,
            window,
            kinds: EventKind::ALL.to_vec(),
            active_only: false,
        }
    }
}

#[derive(Clone)]
pub struct HolderActivityService {
    ledger: Arc<dyn LedgerDataService>,
    settings: ScanSettings,
}

impl HolderActivityService {
    pub fn new(ledger: Arc<dyn LedgerDataService>, settings: ScanSettings) -> Self {
        Self { ledger, settings }
    }

    pub fn settings(&self) -> ScanSettings {
        self.settings
    }

    /// Build the report for `request` as of `now`
    pub async fn build_report(
        &self,
        request: &ReportRequest,
        now: DateTime<Utc>,
        progress: Option<watch::Sender<Progress>>,
    ) -> AggregationResult<ActivityReport> {
        let window = resolve_window(&request.window, now)?;

        let snapshots = load_snapshots(
            self.ledger.as_ref(),
            &request.scope,
            SnapshotLoaderOptions {
                page_size: self.settings.holders_page_size,
                max_holders: self.settings.max_holders,
            },
        )
        .await?;

        let accounts: Vec<String> = snapshots.iter().map(|s| s.address.clone()).collect();

        let mut engine = AggregationEngine::new(
            self.ledger.clone(),
            EngineConfig {
                workers: self.settings.workers,
                page_size: self.settings.activity_page_size,
                kinds: request.kinds.clone(),
            },
        );
        if let Some(sender) = progress {
            engine = engine.with_progress(sender);
        }

        let outcome = engine.run(&request.scope, &accounts, &window).await;
        let rows = merge_report(&snapshots, &outcome.deltas, request.active_only);
        let asset = self.asset_metadata(&request.scope).await;

        tracing::info!(
            token = %request.scope.token,
            holders = snapshots.len(),
            rows = rows.len(),
            skipped = outcome.skipped.len(),
            "Holder activity report ready"
        );

        Ok(ActivityReport {
            scope: request.scope.clone(),
            window,
            asset,
            rows,
            holders_processed: snapshots.len(),
            skipped_accounts: outcome.skipped,
        })
    }

    /// Asset metadata for display; falls back to defaults when the lookup fails
    pub async fn asset_metadata(&self, scope: &TokenScope) -> AssetMetadata {
        match self.ledger.fetch_token_info(scope).await {
            Ok(tokens) => AssetMetadata::from_token_info(&tokens),
            Err(e) => {
                tracing::warn!(token = %scope.token, error = %e, "Token info lookup failed, using defaults");
                AssetMetadata::default()
            }
        }
    }
}
