use std::collections::HashMap;

use alloy::primitives::U256;

use crate::models::activity::{AccountDelta, AccountSnapshot, normalize_address};
use crate::models::report::ReportRow;

/// Join snapshots with their deltas, one row per snapshot.
///
/// Accounts without a delta get zero activity. Rows are ordered by balance
/// descending, then address ascending. With `active_only`, rows with no
/// in/out events are dropped.
pub fn merge_report(
    snapshots: &[AccountSnapshot],
    deltas: &HashMap<String, AccountDelta>,
    active_only: bool,
) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = snapshots
        .iter()
        .map(|snapshot| {
            let address = normalize_address(&snapshot.address);
            match deltas.get(&address) {
                Some(delta) => ReportRow {
                    balance: snapshot.balance,
                    in_count: delta.in_count,
                    in_amount: delta.in_amount,
                    out_count: delta.out_count,
                    out_amount: delta.out_amount,
                    address,
                },
                None => ReportRow {
                    address,
                    balance: snapshot.balance,
                    in_count: 0,
                    in_amount: U256::ZERO,
                    out_count: 0,
                    out_amount: U256::ZERO,
                },
            }
        })
        .filter(|row| !active_only || row.in_count > 0 || row.out_count > 0)
        .collect();

    rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.address.cmp(&b.address)));

    rows
}
