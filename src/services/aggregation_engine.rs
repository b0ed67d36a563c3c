//! Aggregation Engine
//!
//! Runs the activity scanner over every holder with a fixed number of
//! workers. Workers pull accounts from one shared FIFO queue; an account is
//! claimed by exactly one worker, so each worker collects its deltas into a
//! local map and the maps are merged once all workers return. The queue pop
//! is the only synchronized operation.
//!
//! All workers are driven by the single future returned by
//! [`AggregationEngine::run`]; dropping it cancels every in-flight request.

use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

use crate::models::activity::{AccountDelta, EventKind, TokenScope, normalize_address};
use crate::models::report::SkippedAccount;
use crate::models::window::TimeWindow;
use crate::services::activity_scanner::scan_account;
use crate::services::ledger_client::{ActivityQuery, LedgerDataService};

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_ACTIVITY_PAGE_SIZE: u32 = 1000;

/// Completed accounts out of the total, published after every account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workers: usize,
    pub page_size: u32,
    pub kinds: Vec<EventKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            page_size: DEFAULT_ACTIVITY_PAGE_SIZE,
            kinds: EventKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    /// One delta per scanned account, keyed by normalized address
    pub deltas: HashMap<String, AccountDelta>,
    /// Accounts whose scan stopped early; their delta is partial
    pub skipped: Vec<SkippedAccount>,
}

#[derive(Default)]
struct WorkerOutput {
    deltas: Vec<AccountDelta>,
    skipped: Vec<SkippedAccount>,
}

pub struct AggregationEngine {
    ledger: Arc<dyn LedgerDataService>,
    config: EngineConfig,
    progress: Option<watch::Sender<Progress>>,
}

impl AggregationEngine {
    pub fn new(ledger: Arc<dyn LedgerDataService>, config: EngineConfig) -> Self {
        Self {
            ledger,
            config,
            progress: None,
        }
    }

    /// Publish progress to `sender`. Publishing never waits on receivers.
    pub fn with_progress(mut self, sender: watch::Sender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub async fn run(&self, scope: &TokenScope, accounts: &[String], window: &TimeWindow) -> AggregationOutcome {
        // one queue entry per normalized address keeps result keys disjoint
        let mut seen = HashSet::new();
        let queue: VecDeque<String> = accounts
            .iter()
            .map(|account| normalize_address(account))
            .filter(|account| seen.insert(account.clone()))
            .collect();

        let total = queue.len();
        let worker_count = self.config.workers.max(1).min(total.max(1));
        let queue = Mutex::new(queue);
        let completed = AtomicUsize::new(0);

        tracing::info!(
            token = %scope.token,
            accounts = total,
            workers = worker_count,
            from = %window.from,
            to = %window.to,
            "Starting activity aggregation"
        );
        self.publish(Progress { completed: 0, total });

        let workers = (0..worker_count).map(|worker_id| {
            self.run_worker(worker_id, &queue, &completed, total, scope, window)
        });
        let outputs = join_all(workers).await;

        let mut outcome = AggregationOutcome::default();
        for output in outputs {
            for delta in output.deltas {
                outcome.deltas.insert(delta.address.clone(), delta);
            }
            outcome.skipped.extend(output.skipped);
        }
        outcome.skipped.sort_by(|a, b| a.address.cmp(&b.address));

        tracing::info!(
            token = %scope.token,
            scanned = outcome.deltas.len(),
            skipped = outcome.skipped.len(),
            "Activity aggregation complete"
        );

        outcome
    }

    async fn run_worker(
        &self,
        worker_id: usize,
        queue: &Mutex<VecDeque<String>>,
        completed: &AtomicUsize,
        total: usize,
        scope: &TokenScope,
        window: &TimeWindow,
    ) -> WorkerOutput {
        let mut output = WorkerOutput::default();

        while let Some(account) = next_account(queue) {
            let query = ActivityQuery::new(&account, scope, &self.config.kinds, self.config.page_size);
            let scan = scan_account(self.ledger.as_ref(), &query, window).await;

            if let Some(e) = scan.error() {
                output.skipped.push(SkippedAccount {
                    address: account.clone(),
                    reason: e.to_string(),
                });
            }
            output.deltas.push(scan.delta);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            self.publish(Progress { completed: done, total });

            if done % 50 == 0 || done == total {
                tracing::debug!(worker = worker_id, completed = done, total, "Aggregation progress");
            }
        }

        output
    }

    fn publish(&self, progress: Progress) {
        if let Some(sender) = &self.progress {
            sender.send_replace(progress);
        }
    }
}

fn next_account(queue: &Mutex<VecDeque<String>>) -> Option<String> {
    queue.lock().pop_front()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress { completed: 0, total: 0 }.fraction(), 1.0);
        assert_eq!(Progress { completed: 1, total: 4 }.fraction(), 0.25);
        assert_eq!(Progress { completed: 4, total: 4 }.fraction(), 1.0);
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.workers, 5);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.kinds.len(), 6);
    }

    #[test]
    fn test_next_account_is_fifo() {
        let queue = Mutex::new(VecDeque::from(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(next_account(&queue).as_deref(), Some("a"));
        assert_eq!(next_account(&queue).as_deref(), Some("b"));
        assert!(next_account(&queue).is_none());
    }
}
