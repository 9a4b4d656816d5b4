use rust_decimal::Decimal;
use sqlx::Row;

use super::{parse_decimal, RepositoryError};
use crate::DbPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopProduct {
    pub name: String,
    pub quantity_sold: i64,
}

/// Aggregates backing the dashboard. The low-stock list is not part of this
/// struct; it comes from the stock transaction repository's report so the
/// threshold rule lives in one place.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardCounts {
    pub total_clients: i64,
    pub total_products: i64,
    pub total_sales: i64,
    pub total_purchases: i64,
    pub sales_amount: Decimal,
    pub purchases_amount: Decimal,
    pub top_products: Vec<TopProduct>,
}

pub struct SqlStatsRepository {
    pool: DbPool,
}

impl SqlStatsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self) -> Result<DashboardCounts, RepositoryError> {
        let total_clients = self.count("SELECT COUNT(*) FROM client").await?;
        let total_products = self.count("SELECT COUNT(*) FROM product").await?;
        let total_sales =
            self.count("SELECT COUNT(*) FROM stock_txn WHERE kind = 'sale'").await?;
        let total_purchases =
            self.count("SELECT COUNT(*) FROM stock_txn WHERE kind = 'purchase'").await?;

        let sales_amount = self.amount_sum("sale").await?;
        let purchases_amount = self.amount_sum("purchase").await?;
        let top_products = self.top_sold_products(5).await?;

        Ok(DashboardCounts {
            total_clients,
            total_products,
            total_sales,
            total_purchases,
            sales_amount,
            purchases_amount,
            top_products,
        })
    }

    async fn count(&self, sql: &str) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar(sql).fetch_one(&self.pool).await?)
    }

    /// Totals are stored as decimal text, so the sum is folded in Rust to
    /// keep exact decimal arithmetic instead of SQLite's float coercion.
    async fn amount_sum(&self, kind: &str) -> Result<Decimal, RepositoryError> {
        let totals: Vec<String> =
            sqlx::query_scalar("SELECT CAST(total AS TEXT) FROM stock_txn WHERE kind = ?")
                .bind(kind)
                .fetch_all(&self.pool)
                .await?;

        let mut sum = Decimal::ZERO;
        for total in &totals {
            sum += parse_decimal("total", total)?;
        }
        Ok(sum)
    }

    async fn top_sold_products(&self, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT p.name, SUM(l.quantity) AS quantity_sold
             FROM stock_txn_line l
             JOIN stock_txn t ON t.id = l.txn_id
             JOIN product p ON p.id = l.product_id
             WHERE t.kind = 'sale'
             GROUP BY p.id, p.name
             ORDER BY quantity_sold DESC, p.name ASC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<TopProduct, RepositoryError> {
                Ok(TopProduct {
                    name: row.try_get("name")?,
                    quantity_sold: row.try_get("quantity_sold")?,
                })
            })
            .collect()
    }
}
