use alloy::primitives::Address;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::str::FromStr;

use crate::{
    AppState,
    error::AggregationError,
    models::{
        activity::TokenScope,
        chain::resolve_chain_id,
        report::{ActivityReport, ActivityReportQuery, ActivityReportResponse, ErrorResponse, ReportRowResponse},
    },
    services::{amount_format::format_amount, holder_activity::ReportRequest, window::parse_range},
};

type ApiError = (StatusCode, Json<ErrorResponse>);

pub async fn health() -> &'static str {
    "ok"
}

/// Handler for GET /api/holders/{chain}/{token}/activity
/// Current balances of every holder plus in/out activity within the window
pub async fn get_holder_activity(
    State(state): State<AppState>,
    Path((chain, token)): Path<(String, String)>,
    Query(query): Query<ActivityReportQuery>,
) -> Result<(StatusCode, Json<ActivityReportResponse>), ApiError> {
    tracing::info!("Holder activity request: chain={} token={} query={:?}", chain, token, query);

    let chain_id = resolve_chain_id(&chain).ok_or_else(|| {
        error_response(AggregationError::InvalidRequest(format!("unsupported chain '{}'", chain)))
    })?;

    let token_address = Address::from_str(token.trim()).map_err(|e| {
        error_response(AggregationError::InvalidRequest(format!(
            "invalid token address '{}': {}",
            token, e
        )))
    })?;

    let window = parse_range(query.range.as_deref(), query.from.clone(), query.to.clone())
        .map_err(error_response)?;

    let mut request = ReportRequest::new(TokenScope::new(chain_id, &token_address.to_string()), window);
    request.active_only = query.active_only.unwrap_or(false);

    let report = state
        .holder_activity
        .build_report(&request, Utc::now(), None)
        .await
        .map_err(|e| {
            tracing::error!("Failed to build holder activity report: {}", e);
            error_response(e)
        })?;

    Ok((StatusCode::OK, Json(to_response(&report))))
}

/// Raw amounts as decimal strings plus display strings using the asset's decimals
pub fn to_response(report: &ActivityReport) -> ActivityReportResponse {
    let decimals = report.asset.decimals;

    ActivityReportResponse {
        chain_id: report.scope.chain_id,
        token: report.scope.token.clone(),
        window: report.window,
        asset: report.asset.clone(),
        holders_processed: report.holders_processed,
        skipped_count: report.skipped_count(),
        skipped_accounts: report.skipped_accounts.clone(),
        rows: report
            .rows
            .iter()
            .map(|row| ReportRowResponse {
                address: row.address.clone(),
                balance: row.balance.to_string(),
                balance_formatted: format_amount(row.balance, decimals),
                in_count: row.in_count,
                in_amount: row.in_amount.to_string(),
                in_amount_formatted: format_amount(row.in_amount, decimals),
                out_count: row.out_count,
                out_amount: row.out_amount.to_string(),
                out_amount_formatted: format_amount(row.out_amount, decimals),
            })
            .collect(),
    }
}

fn error_status(err: &AggregationError) -> StatusCode {
    match err {
        AggregationError::InvalidRange(_) | AggregationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        AggregationError::UpstreamError(_)
        | AggregationError::MalformedRecord(_)
        | AggregationError::PaginationLoopDetected { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: AggregationError) -> ApiError {
    (
        error_status(&err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
