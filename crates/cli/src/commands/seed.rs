use crate::commands::CommandResult;
use comptoir_core::config::{AppConfig, LoadOptions};
use comptoir_db::{connect_with_settings, migrations, DemoSeedDataset};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
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
                "seed",
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

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedOutput, (&'static str, String, u8)> =
            if !verification.all_present {
                let failed_checks = verification
                    .checks
                    .iter()
                    .filter_map(|(check, passed)| (!passed).then_some(*check))
                    .collect::<Vec<_>>();
                let message = if failed_checks.is_empty() {
                    "Some seed data failed to load".to_string()
                } else {
                    format!("Seed verification failed for checks: {}", failed_checks.join(", "))
                };
                Err(("seed_verification", message, 6u8))
            } else {
                Ok(SeedOutput { tables: seed_result.tables })
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(output) => {
            let table_descriptions: Vec<String> = output
                .tables
                .iter()
                .map(|table| format!("  - {}: {} rows", table.table, table.rows))
                .collect();
            let message = format!(
                "Demo dataset loaded and verified:\n{}",
                table_descriptions.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    tables: Vec<comptoir_db::fixtures::SeedTableInfo>,
}
