use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::models::activity::{TokenInfoRecord, TokenScope};
use crate::models::window::TimeWindow;

const DEFAULT_DECIMALS: u8 = 18;

/// Display metadata of the summarized asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Default for AssetMetadata {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            symbol: String::new(),
            name: String::new(),
            logo: None,
        }
    }
}

impl AssetMetadata {
    /// Each field comes from the first token-info entry when present, else the default
    pub fn from_token_info(tokens: &[TokenInfoRecord]) -> Self {
        let defaults = Self::default();
        let Some(first) = tokens.first() else {
            return defaults;
        };

        Self {
            decimals: first.decimals.unwrap_or(defaults.decimals),
            symbol: first.symbol.clone().unwrap_or(defaults.symbol),
            name: first.name.clone().unwrap_or(defaults.name),
            logo: first.logo.clone(),
        }
    }
}

/// Account whose activity scan stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAccount {
    pub address: String,
    pub reason: String,
}

/// Snapshot balance joined with windowed activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub address: String,
    pub balance: U256,
    pub in_count: u64,
    pub in_amount: U256,
    pub out_count: u64,
    pub out_amount: U256,
}

#[derive(Debug, Clone)]
pub struct ActivityReport {
    pub scope: TokenScope,
    pub window: TimeWindow,
    pub asset: AssetMetadata,
    pub rows: Vec<ReportRow>,
    pub holders_processed: usize,
    pub skipped_accounts: Vec<SkippedAccount>,
}

impl ActivityReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped_accounts.len()
    }
}

/// Query parameters for GET /api/holders/{chain}/{token}/activity
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityReportQuery {
    pub range: Option<String>,       // days, "0" for custom, "all" for unbounded
    pub from: Option<String>,        // custom window start (RFC 3339 or YYYY-MM-DD)
    pub to: Option<String>,          // custom window end
    pub active_only: Option<bool>,   // Default: false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRowResponse {
    pub address: String,
    pub balance: String,
    pub balance_formatted: String,
    pub in_count: u64,
    pub in_amount: String,
    pub in_amount_formatted: String,
    pub out_count: u64,
    pub out_amount: String,
    pub out_amount_formatted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReportResponse {
    pub chain_id: u64,
    pub token: String,
    pub window: TimeWindow,
    pub asset: AssetMetadata,
    pub holders_processed: usize,
    pub skipped_count: usize,
    pub skipped_accounts: Vec<SkippedAccount>,
    pub rows: Vec<ReportRowResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
