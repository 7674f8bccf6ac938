use anyhow::Result;
use tracing::info;

use contara_core::{PucLiteProfile, StandardsProfile};
use contara_inventory::run_normalization;
use contara_platform::{PgInventoryStore, ServiceConfig, connect_database};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "contara_ops=info,contara_inventory=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let pool = connect_database(&config.database_url).await?;
    let store = PgInventoryStore::new(pool);

    let profile = PucLiteProfile;
    let chart = profile.chart_of_accounts();
    info!(
        profile = profile.name(),
        method = profile.inventory_valuation_method(),
        "starting inventory cost normalization"
    );

    let report = run_normalization(&store, &chart).await?;

    info!(
        run_id = %report.run_id,
        scanned = report.items_scanned,
        applied = report.items_applied,
        failed = report.failures.len(),
        total_delta = %report.total_delta,
        journal_entry = ?report.journal_entry_id,
        "normalization run finished"
    );

    if !report.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
