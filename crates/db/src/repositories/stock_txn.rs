use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, Sqlite, Transaction};

use comptoir_core::domain::product::{LowStockProduct, ProductId};
use comptoir_core::domain::transaction::{
    Counterparty, NewTransaction, TransactionDetail, TransactionId, TransactionKind,
    TransactionLine, TransactionSummary,
};
use comptoir_core::domain::user::UserId;

use super::{
    parse_decimal, parse_quantity, parse_timestamp, RepositoryError, StockTransactionRepository,
    StockTxnError,
};
use crate::DbPool;

/// The one place that writes sale/purchase headers, their lines, and product
/// stock levels. Every mutation runs inside a single database transaction;
/// any failure on the way rolls back the whole batch.
pub struct SqlStockTransactionRepository {
    pool: DbPool,
}

impl SqlStockTransactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockTransactionRepository for SqlStockTransactionRepository {
    async fn record(&self, input: &NewTransaction) -> Result<TransactionId, StockTxnError> {
        // Reject malformed input before the unit-of-work opens.
        input.validate()?;

        let (client_id, supplier_id) = match input.counterparty {
            Counterparty::Client(client) => (Some(client.0), None),
            Counterparty::Supplier(supplier) => (None, Some(supplier.0)),
        };

        let mut tx = self.pool.begin().await?;

        let header = sqlx::query(
            "INSERT INTO stock_txn (kind, client_id, supplier_id, total, occurred_at, recorded_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.kind.as_str())
        .bind(client_id)
        .bind(supplier_id)
        .bind(input.total.to_string())
        .bind(input.occurred_at.to_rfc3339())
        .bind(input.recorded_by.map(|user| user.0))
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|error| header_insert_error(error, input.counterparty))?;

        let id = TransactionId(header.last_insert_rowid());

        // Lines are processed strictly in caller order; the first failure
        // aborts everything already staged in this unit-of-work.
        for line in &input.lines {
            sqlx::query(
                "INSERT INTO stock_txn_line (txn_id, product_id, quantity, unit_price, line_total)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id.0)
            .bind(line.product_id.0)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.to_string())
            .bind(line.line_total().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|error| line_insert_error(error, line.product_id))?;

            adjust_stock(&mut tx, line.product_id, input.kind.stock_delta(line.quantity)).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn reverse(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<(), StockTxnError> {
        let mut tx = self.pool.begin().await?;

        let header: Option<i64> =
            sqlx::query_scalar("SELECT id FROM stock_txn WHERE id = ? AND kind = ?")
                .bind(id.0)
                .bind(kind.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if header.is_none() {
            return Err(StockTxnError::NotFound(id));
        }

        // A header without lines violates the creation invariant; treat it as
        // an orphan and fall through to the deletes with no stock to restore.
        let lines = sqlx::query(
            "SELECT product_id, quantity FROM stock_txn_line WHERE txn_id = ? ORDER BY id ASC",
        )
        .bind(id.0)
        .fetch_all(&mut *tx)
        .await?;

        for row in lines {
            let product = ProductId(row.try_get("product_id")?);
            let quantity = parse_quantity("quantity", row.try_get("quantity")?)?;
            adjust_stock(&mut tx, product, -kind.stock_delta(quantity)).await?;
        }

        sqlx::query("DELETE FROM stock_txn_line WHERE txn_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM stock_txn WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StockTxnError::NotFound(id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, kind: TransactionKind) -> Result<Vec<TransactionSummary>, StockTxnError> {
        let sql = match kind {
            TransactionKind::Sale => {
                "SELECT t.id, c.name AS counterparty_name,
                        CAST(t.total AS TEXT) AS total_text, t.occurred_at, t.recorded_by
                 FROM stock_txn t
                 JOIN client c ON c.id = t.client_id
                 WHERE t.kind = 'sale'
                 ORDER BY t.occurred_at DESC, t.id DESC"
            }
            TransactionKind::Purchase => {
                "SELECT t.id, s.name AS counterparty_name,
                        CAST(t.total AS TEXT) AS total_text, t.occurred_at, t.recorded_by
                 FROM stock_txn t
                 JOIN supplier s ON s.id = t.supplier_id
                 WHERE t.kind = 'purchase'
                 ORDER BY t.occurred_at DESC, t.id DESC"
            }
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| summary_from_row(row).map_err(StockTxnError::from))
            .collect()
    }

    async fn fetch(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<TransactionDetail, StockTxnError> {
        let sql = match kind {
            TransactionKind::Sale => {
                "SELECT t.id, t.client_id AS counterparty_id, c.name AS counterparty_name,
                        CAST(t.total AS TEXT) AS total_text, t.occurred_at, t.recorded_by
                 FROM stock_txn t
                 JOIN client c ON c.id = t.client_id
                 WHERE t.id = ? AND t.kind = 'sale'"
            }
            TransactionKind::Purchase => {
                "SELECT t.id, t.supplier_id AS counterparty_id, s.name AS counterparty_name,
                        CAST(t.total AS TEXT) AS total_text, t.occurred_at, t.recorded_by
                 FROM stock_txn t
                 JOIN supplier s ON s.id = t.supplier_id
                 WHERE t.id = ? AND t.kind = 'purchase'"
            }
        };

        let header = sqlx::query(sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StockTxnError::NotFound(id))?;

        let line_rows = sqlx::query(
            "SELECT l.product_id, p.name AS product_name, l.quantity,
                    CAST(l.unit_price AS TEXT) AS unit_price_text,
                    CAST(l.line_total AS TEXT) AS line_total_text
             FROM stock_txn_line l
             JOIN product p ON p.id = l.product_id
             WHERE l.txn_id = ?
             ORDER BY l.id ASC",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .into_iter()
            .map(line_from_row)
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let total_text: String = header.try_get("total_text")?;
        Ok(TransactionDetail {
            id: TransactionId(header.try_get("id")?),
            kind,
            counterparty_id: header.try_get("counterparty_id")?,
            counterparty_name: header.try_get("counterparty_name")?,
            total: parse_decimal("total", &total_text)?,
            occurred_at: parse_timestamp("occurred_at", header.try_get("occurred_at")?)?,
            recorded_by: header.try_get::<Option<i64>, _>("recorded_by")?.map(UserId),
            lines,
        })
    }

    async fn low_stock(&self) -> Result<Vec<LowStockProduct>, StockTxnError> {
        let rows = sqlx::query(
            "SELECT name, quantity_on_hand, alert_threshold
             FROM product
             WHERE quantity_on_hand <= alert_threshold
             ORDER BY quantity_on_hand ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<LowStockProduct, StockTxnError> {
                Ok(LowStockProduct {
                    name: row.try_get("name")?,
                    quantity_on_hand: row.try_get("quantity_on_hand")?,
                    alert_threshold: row.try_get("alert_threshold")?,
                })
            })
            .collect()
    }
}

/// Applies one signed stock movement as a single guarded UPDATE; the guard
/// keeps on-hand quantity from going negative. The follow-up SELECT runs only
/// on the failure path, to name the failure, and stays inside the caller's
/// transaction.
async fn adjust_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product: ProductId,
    delta: i64,
) -> Result<(), StockTxnError> {
    let updated = sqlx::query(
        "UPDATE product
         SET quantity_on_hand = quantity_on_hand + ?1
         WHERE id = ?2 AND quantity_on_hand + ?1 >= 0",
    )
    .bind(delta)
    .bind(product.0)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 1 {
        return Ok(());
    }

    let on_hand: Option<i64> =
        sqlx::query_scalar("SELECT quantity_on_hand FROM product WHERE id = ?")
            .bind(product.0)
            .fetch_optional(&mut **tx)
            .await?;

    match on_hand {
        None => Err(StockTxnError::ProductNotFound(product)),
        Some(on_hand) => Err(StockTxnError::InsufficientStock { product, on_hand, delta }),
    }
}

fn header_insert_error(error: sqlx::Error, counterparty: Counterparty) -> StockTxnError {
    match &error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StockTxnError::Repository(
            RepositoryError::NotFound { entity: "counterparty", id: counterparty.raw_id() },
        ),
        _ => StockTxnError::from(error),
    }
}

fn line_insert_error(error: sqlx::Error, product: ProductId) -> StockTxnError {
    match &error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StockTxnError::ProductNotFound(product)
        }
        _ => StockTxnError::from(error),
    }
}

fn summary_from_row(row: SqliteRow) -> Result<TransactionSummary, RepositoryError> {
    let total_text: String = row.try_get("total_text")?;
    Ok(TransactionSummary {
        id: TransactionId(row.try_get("id")?),
        counterparty_name: row.try_get("counterparty_name")?,
        total: parse_decimal("total", &total_text)?,
        occurred_at: parse_timestamp("occurred_at", row.try_get("occurred_at")?)?,
        recorded_by: row.try_get::<Option<i64>, _>("recorded_by")?.map(UserId),
    })
}

fn line_from_row(row: SqliteRow) -> Result<TransactionLine, RepositoryError> {
    let unit_price_text: String = row.try_get("unit_price_text")?;
    let line_total_text: String = row.try_get("line_total_text")?;
    Ok(TransactionLine {
        product_id: ProductId(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: parse_quantity("quantity", row.try_get("quantity")?)?,
        unit_price: parse_decimal("unit_price", &unit_price_text)?,
        line_total: parse_decimal("line_total", &line_total_text)?,
    })
}
