use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Expected products of the demo dataset; `Sirop de menthe` and
/// `Miel de lavande` sit at or below their thresholds so the low-stock
/// report has something to show out of the box.
const SEED_PRODUCTS: &[SeedProductContract] = &[
    SeedProductContract { id: 1, name: "Jus de pomme 75cl", quantity_on_hand: 48, alert_threshold: 12 },
    SeedProductContract { id: 2, name: "Sirop de menthe 1L", quantity_on_hand: 10, alert_threshold: 10 },
    SeedProductContract { id: 3, name: "Miel de lavande 500g", quantity_on_hand: 4, alert_threshold: 6 },
    SeedProductContract { id: 4, name: "Café moulu 250g", quantity_on_hand: 25, alert_threshold: 8 },
];

const SEED_TABLES: &[SeedTableContract] = &[
    SeedTableContract { table: "category", expected_rows: 2 },
    SeedTableContract { table: "client", expected_rows: 2 },
    SeedTableContract { table: "supplier", expected_rows: 2 },
    SeedTableContract { table: "app_user", expected_rows: 2 },
    SeedTableContract { table: "product", expected_rows: 4 },
];

struct SeedProductContract {
    id: i64,
    name: &'static str,
    quantity_on_hand: i64,
    alert_threshold: i64,
}

struct SeedTableContract {
    table: &'static str,
    expected_rows: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedTableInfo {
    pub table: &'static str,
    pub rows: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub tables: Vec<SeedTableInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Deterministic demo fixtures: master data only (categories, parties, users,
/// products). Transactions are intentionally absent so recorded demo activity
/// always goes through the real recording path.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let tables = SEED_TABLES
            .iter()
            .map(|contract| SeedTableInfo { table: contract.table, rows: contract.expected_rows })
            .collect();

        Ok(SeedResult { tables })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for contract in SEED_TABLES {
            let count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", contract.table))
                    .fetch_one(pool)
                    .await?;
            checks.push((contract.table, count >= contract.expected_rows));
        }

        for product in SEED_PRODUCTS {
            let matches: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM product
                    WHERE id = ?1 AND name = ?2
                      AND quantity_on_hand = ?3 AND alert_threshold = ?4
                 )",
            )
            .bind(product.id)
            .bind(product.name)
            .bind(product.quantity_on_hand)
            .bind(product.alert_threshold)
            .fetch_one(pool)
            .await?;
            checks.push((product.name, matches == 1));
        }

        let admin_present: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM app_user WHERE username = 'mlefevre' AND role = 'admin')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("admin-user", admin_present == 1));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}
