use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AggregationError, AggregationResult};

/// Canonical form of an account or asset address used for every map key
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Parse a raw upstream amount (decimal string) into a U256
pub fn parse_amount(raw: &str) -> AggregationResult<U256> {
    let digits = raw.trim();
    if digits.is_empty() {
        return Err(AggregationError::MalformedRecord("empty amount".to_string()));
    }

    U256::from_str_radix(digits, 10)
        .map_err(|e| AggregationError::MalformedRecord(format!("invalid amount '{}': {}", raw, e)))
}

/// Token being summarized: one asset on one chain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenScope {
    pub chain_id: u64,
    pub token: String,
}

impl TokenScope {
    pub fn new(chain_id: u64, token: &str) -> Self {
        Self {
            chain_id,
            token: normalize_address(token),
        }
    }
}

/// One page of an upstream sequence
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continuation: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_offset: Option<String>) -> Self {
        Self {
            items,
            // An empty offset means the same as no offset
            continuation: next_offset.filter(|token| !token.is_empty()),
        }
    }
}

// Ledger data service response structures

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderRecord {
    pub wallet_address: String,
    pub balance: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoldersResponse {
    #[serde(default)]
    pub holders: Vec<HolderRecord>,
    #[serde(default)]
    pub next_offset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub block_time: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub from_token_address: Option<String>,
    #[serde(default)]
    pub from_token_value: Option<String>,
    #[serde(default)]
    pub to_token_address: Option<String>,
    #[serde(default)]
    pub to_token_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityResponse {
    #[serde(default)]
    pub activity: Vec<ActivityRecord>,
    #[serde(default)]
    pub next_offset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenInfoRecord {
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfoResponse {
    #[serde(default)]
    pub tokens: Vec<TokenInfoRecord>,
}

/// Balance of one holder at query time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: String,
    pub balance: U256,
}

impl TryFrom<&HolderRecord> for AccountSnapshot {
    type Error = AggregationError;

    fn try_from(record: &HolderRecord) -> Result<Self, Self::Error> {
        if record.wallet_address.trim().is_empty() {
            return Err(AggregationError::MalformedRecord(
                "holder record without wallet_address".to_string(),
            ));
        }

        Ok(Self {
            address: normalize_address(&record.wallet_address),
            balance: parse_amount(&record.balance)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Send,
    Receive,
    Mint,
    Burn,
    SwapIn,
    SwapOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Send,
        EventKind::Receive,
        EventKind::Mint,
        EventKind::Burn,
        EventKind::SwapIn,
        EventKind::SwapOut,
    ];

    pub fn direction(self) -> Direction {
        match self {
            EventKind::Send | EventKind::Burn | EventKind::SwapOut => Direction::Outgoing,
            EventKind::Receive | EventKind::Mint | EventKind::SwapIn => Direction::Incoming,
        }
    }

    /// Activity type name used by the upstream `activity_type` filter
    pub fn upstream_type(self) -> &'static str {
        match self {
            EventKind::Send => "send",
            EventKind::Receive => "receive",
            EventKind::Mint => "mint",
            EventKind::Burn => "burn",
            EventKind::SwapIn | EventKind::SwapOut => "swap",
        }
    }
}

/// Where an event's asset address and amount are read from.
///
/// Transfers (send/receive/mint/burn) use `token_address` + `value`. Swaps are
/// checked leg by leg in `SWAP_LEG_PRECEDENCE` order: the first leg whose token
/// is the target asset decides the kind and the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountSource {
    Transfer,
    SwapFromLeg,
    SwapToLeg,
}

const SWAP_LEG_PRECEDENCE: [AmountSource; 2] = [AmountSource::SwapFromLeg, AmountSource::SwapToLeg];

impl AmountSource {
    fn fields<'a>(self, record: &'a ActivityRecord) -> (Option<&'a str>, Option<&'a str>) {
        match self {
            AmountSource::Transfer => (record.token_address.as_deref(), record.value.as_deref()),
            AmountSource::SwapFromLeg => (
                record.from_token_address.as_deref(),
                record.from_token_value.as_deref(),
            ),
            AmountSource::SwapToLeg => (
                record.to_token_address.as_deref(),
                record.to_token_value.as_deref(),
            ),
        }
    }
}

/// One transfer-type occurrence for the target asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub asset_address: String,
    pub amount: U256,
    pub kind: EventKind,
}

impl ActivityEvent {
    /// Convert an upstream record into an event for `asset`.
    ///
    /// Returns `Ok(None)` for records that are not transfer-type activity of
    /// the target asset (approvals, contract calls, other tokens, native
    /// transfers).
    pub fn from_record(record: &ActivityRecord, asset: &str) -> AggregationResult<Option<Self>> {
        let asset = normalize_address(asset);
        let matches_asset =
            |candidate: Option<&str>| candidate.map(normalize_address).as_deref() == Some(asset.as_str());

        let (kind, source) = match record.activity_type.as_str() {
            "send" => (EventKind::Send, AmountSource::Transfer),
            "receive" => (EventKind::Receive, AmountSource::Transfer),
            "mint" => (EventKind::Mint, AmountSource::Transfer),
            "burn" => (EventKind::Burn, AmountSource::Transfer),
            "swap" => {
                let leg = SWAP_LEG_PRECEDENCE
                    .into_iter()
                    .find(|leg| matches_asset(leg.fields(record).0));
                match leg {
                    Some(AmountSource::SwapFromLeg) => (EventKind::SwapOut, AmountSource::SwapFromLeg),
                    Some(_) => (EventKind::SwapIn, AmountSource::SwapToLeg),
                    None => return Ok(None),
                }
            }
            _ => return Ok(None),
        };

        let (asset_field, amount_field) = source.fields(record);
        if !matches_asset(asset_field) {
            return Ok(None);
        }

        let timestamp = parse_block_time(&record.block_time)?;
        let amount = match amount_field {
            Some(raw) => parse_amount(raw)?,
            None => {
                return Err(AggregationError::MalformedRecord(format!(
                    "{} event at {} has no amount",
                    record.activity_type, record.block_time
                )));
            }
        };

        Ok(Some(Self {
            timestamp,
            from_address: record.from.as_deref().map(normalize_address),
            to_address: record.to.as_deref().map(normalize_address),
            asset_address: asset,
            amount,
            kind,
        }))
    }
}

fn parse_block_time(raw: &str) -> AggregationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AggregationError::MalformedRecord(format!("invalid block_time '{}': {}", raw, e)))
}

/// In/out activity of one account within the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDelta {
    pub address: String,
    pub in_count: u64,
    pub in_amount: U256,
    pub out_count: u64,
    pub out_amount: U256,
}

impl AccountDelta {
    pub fn new(address: &str) -> Self {
        Self {
            address: normalize_address(address),
            in_count: 0,
            in_amount: U256::ZERO,
            out_count: 0,
            out_amount: U256::ZERO,
        }
    }

    /// Add one event to the running totals
    pub fn record(&mut self, event: &ActivityEvent) -> AggregationResult<()> {
        let (count, amount) = match event.kind.direction() {
            Direction::Incoming => (&mut self.in_count, &mut self.in_amount),
            Direction::Outgoing => (&mut self.out_count, &mut self.out_amount),
        };

        *amount = amount.checked_add(event.amount).ok_or_else(|| {
            AggregationError::MalformedRecord(format!(
                "amount overflow while accumulating activity for {}",
                self.address
            ))
        })?;
        *count += 1;

        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.in_count > 0 || self.out_count > 0
    }
}
