use crate::commands::CommandResult;
use comptoir_core::config::{AppConfig, LoadOptions};
use comptoir_db::repositories::{SqlStockTransactionRepository, StockTransactionRepository};
use comptoir_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "low-stock",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "low-stock",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        // Safe on a fresh install: an un-migrated database would otherwise
        // turn a report into a hard error.
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let report = SqlStockTransactionRepository::new(pool.clone())
            .low_stock()
            .await
            .map_err(|error| ("report_query", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) if report.is_empty() => {
            CommandResult::success("low-stock", "no products at or below their alert threshold")
        }
        Ok(report) => {
            let lines: Vec<String> = report
                .iter()
                .map(|product| {
                    format!(
                        "  - {}: {} on hand (threshold {})",
                        product.name, product.quantity_on_hand, product.alert_threshold
                    )
                })
                .collect();
            let message = format!(
                "{} product(s) at or below their alert threshold:\n{}",
                report.len(),
                lines.join("\n")
            );
            CommandResult::success("low-stock", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("low-stock", error_class, message, exit_code)
        }
    }
}
