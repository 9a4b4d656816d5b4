use std::env;
use std::sync::{Mutex, OnceLock};

use comptoir_cli::commands::{doctor, low_stock, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("COMPTOIR_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_with_invalid_database_url() {
    with_env(&[("COMPTOIR_DATABASE_URL", "postgres://nope")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_returns_deterministic_table_summary() {
    with_env(&[("COMPTOIR_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("  - category: 2 rows"));
        assert!(message.contains("  - product: 4 rows"));
        assert!(message.contains("  - app_user: 2 rows"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let url = file_db_url(&dir);

    with_env(&[("COMPTOIR_DATABASE_URL", &url)], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["status"], "ok");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["status"], "ok");

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn low_stock_reports_seeded_products_below_threshold() {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let url = file_db_url(&dir);

    with_env(&[("COMPTOIR_DATABASE_URL", &url)], || {
        let seeded = seed::run();
        assert_eq!(seeded.exit_code, 0, "seed should succeed before the report");

        let result = low_stock::run();
        assert_eq!(result.exit_code, 0, "expected low-stock report success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "low-stock");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("Sirop de menthe 1L"), "at-threshold product must appear");
        assert!(message.contains("Miel de lavande 500g"), "below-threshold product must appear");
        assert!(!message.contains("Jus de pomme 75cl"), "well-stocked product must not appear");
    });
}

#[test]
fn low_stock_on_an_empty_database_reports_nothing() {
    with_env(&[("COMPTOIR_DATABASE_URL", "sqlite::memory:")], || {
        let result = low_stock::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["message"], "no products at or below their alert threshold");
    });
}

#[test]
fn doctor_passes_against_a_migrated_database() {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let url = file_db_url(&dir);

    with_env(&[("COMPTOIR_DATABASE_URL", &url)], || {
        let migrated = migrate::run();
        assert_eq!(migrated.exit_code, 0, "migrate should succeed before doctor");

        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "pass");

        let checks = report["checks"].as_array().expect("checks array");
        let names: Vec<&str> =
            checks.iter().filter_map(|check| check["name"].as_str()).collect();
        assert_eq!(names, vec!["config_validation", "database_connectivity", "schema_readiness"]);
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn file_db_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("comptoir.db").display())
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "COMPTOIR_DATABASE_URL",
        "COMPTOIR_DATABASE_MAX_CONNECTIONS",
        "COMPTOIR_DATABASE_TIMEOUT_SECS",
        "COMPTOIR_SERVER_BIND_ADDRESS",
        "COMPTOIR_SERVER_PORT",
        "COMPTOIR_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "COMPTOIR_LOGGING_LEVEL",
        "COMPTOIR_LOGGING_FORMAT",
        "COMPTOIR_LOG_LEVEL",
        "COMPTOIR_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
