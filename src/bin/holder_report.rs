use std::env;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use holder_activity::config::AppConfig;
use holder_activity::models::activity::TokenScope;
use holder_activity::models::chain::resolve_chain_id;
use holder_activity::services::aggregation_engine::Progress;
use holder_activity::services::amount_format::format_amount;
use holder_activity::services::holder_activity::{HolderActivityService, ReportRequest};
use holder_activity::services::ledger_client::SimLedgerClient;
use holder_activity::services::window::parse_range;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,holder_activity=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let active_only = args.iter().any(|a| a == "--active-only");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();

    if positional.len() < 2 {
        eprintln!("Usage: {} <chain> <token> [range] [--active-only]", args[0]);
        eprintln!("  range: days (default 7) or 'all'");
        eprintln!("Example: {} base 0x833589fcd6edb6e08f4c7c32d4f71b54bda02913 30", args[0]);
        std::process::exit(1);
    }

    let chain_id = resolve_chain_id(positional[0]).ok_or(format!("Unsupported chain '{}'", positional[0]))?;
    let token = positional[1];
    let window = parse_range(positional.get(2).map(|r| r.as_str()), None, None)?;

    let config = AppConfig::from_env()?;
    let ledger = SimLedgerClient::new(
        config.ledger_api_base_url.clone(),
        config.ledger_api_key.clone(),
        config.ledger_timeout,
        config.token_info_cache_ttl,
    )?;
    let service = HolderActivityService::new(Arc::new(ledger), config.scan);

    let mut request = ReportRequest::new(TokenScope::new(chain_id, token), window);
    request.active_only = active_only;

    let (progress_tx, mut progress_rx) = watch::channel(Progress::default());
    let progress_printer = tokio::spawn(async move {
        let mut last_decile = 0;
        while progress_rx.changed().await.is_ok() {
            let progress = *progress_rx.borrow_and_update();
            let decile = (progress.fraction() * 10.0) as u32;
            if progress.total > 0 && decile > last_decile {
                last_decile = decile;
                eprintln!("⏳ scanned {}/{} holders", progress.completed, progress.total);
            }
        }
    });

    let report = service.build_report(&request, Utc::now(), Some(progress_tx)).await?;
    progress_printer.await.ok();

    let decimals = report.asset.decimals;
    println!(
        "{} ({}) on chain {} | {} → {}",
        report.asset.name, report.asset.symbol, report.scope.chain_id, report.window.from, report.window.to
    );
    println!(
        "{:<44} {:>24} {:>6} {:>20} {:>6} {:>20}",
        "holder", "balance", "in#", "in", "out#", "out"
    );
    for row in &report.rows {
        println!(
            "{:<44} {:>24} {:>6} {:>20} {:>6} {:>20}",
            row.address,
            format_amount(row.balance, decimals),
            row.in_count,
            format_amount(row.in_amount, decimals),
            row.out_count,
            format_amount(row.out_amount, decimals)
        );
    }

    println!(
        "✅ {} holders processed, {} skipped",
        report.holders_processed,
        report.skipped_count()
    );
    for skipped in &report.skipped_accounts {
        println!("  ⚠️  {}: {}", skipped.address, skipped.reason);
    }

    Ok(())
}
