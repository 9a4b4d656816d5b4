use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use comptoir_core::domain::category::CategoryId;
use comptoir_core::domain::product::{NewProduct, Product, ProductId, ProductUpdate};
use comptoir_core::domain::supplier::SupplierId;

use super::{map_fk_violation, parse_decimal, parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO product (
                name, description, category_id, supplier_id,
                purchase_price, sale_price, quantity_on_hand, alert_threshold, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.category_id.map(|id| id.0))
        .bind(input.supplier_id.map(|id| id.0))
        .bind(input.purchase_price.to_string())
        .bind(input.sale_price.to_string())
        .bind(input.quantity_on_hand)
        .bind(input.alert_threshold)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Product {
            id: ProductId(result.last_insert_rowid()),
            name: input.name.clone(),
            description: input.description.clone(),
            category_id: input.category_id,
            supplier_id: input.supplier_id,
            purchase_price: input.purchase_price,
            sale_price: input.sale_price,
            quantity_on_hand: input.quantity_on_hand,
            alert_threshold: input.alert_threshold,
            created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id, name, description, category_id, supplier_id,
                CAST(purchase_price AS TEXT) AS purchase_price_text,
                CAST(sale_price AS TEXT) AS sale_price_text,
                quantity_on_hand, alert_threshold, created_at
             FROM product
             ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(product_from_row).collect()
    }

    pub async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id, name, description, category_id, supplier_id,
                CAST(purchase_price AS TEXT) AS purchase_price_text,
                CAST(sale_price AS TEXT) AS sale_price_text,
                quantity_on_hand, alert_threshold, created_at
             FROM product
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(product_from_row).transpose()
    }

    /// Updates descriptive, pricing, and threshold fields. On-hand quantity is
    /// not touched here: it only moves through recorded transactions.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            "UPDATE product SET
                name = ?, description = ?, category_id = ?, supplier_id = ?,
                purchase_price = ?, sale_price = ?, alert_threshold = ?
             WHERE id = ?",
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.category_id.map(|category| category.0))
        .bind(input.supplier_id.map(|supplier| supplier.0))
        .bind(input.purchase_price.to_string())
        .bind(input.sale_price.to_string())
        .bind(input.alert_threshold)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "product", id: id.0 });
        }

        self.find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound { entity: "product", id: id.0 })
    }

    /// A product referenced by any transaction line cannot be removed; the
    /// foreign key keeps transaction history intact.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|error| map_fk_violation(error, "product", id.0))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "product", id: id.0 });
        }

        Ok(())
    }
}

fn product_from_row(row: SqliteRow) -> Result<Product, RepositoryError> {
    let purchase_price_text: String = row.try_get("purchase_price_text")?;
    let sale_price_text: String = row.try_get("sale_price_text")?;

    Ok(Product {
        id: ProductId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category_id: row.try_get::<Option<i64>, _>("category_id")?.map(CategoryId),
        supplier_id: row.try_get::<Option<i64>, _>("supplier_id")?.map(SupplierId),
        purchase_price: parse_decimal("purchase_price", &purchase_price_text)?,
        sale_price: parse_decimal("sale_price", &sale_price_text)?,
        quantity_on_hand: row.try_get("quantity_on_hand")?,
        alert_threshold: row.try_get("alert_threshold")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use comptoir_core::domain::product::{NewProduct, ProductUpdate};

    use super::SqlProductRepository;
    use crate::repositories::RepositoryError;
    use crate::{connect_with_settings, migrations, DbPool};

    fn sample_product(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: Some("Bouteille 75cl".to_string()),
            category_id: None,
            supplier_id: None,
            purchase_price: Decimal::new(250, 2),
            sale_price: Decimal::new(450, 2),
            quantity_on_hand: 10,
            alert_threshold: 5,
        }
    }

    #[tokio::test]
    async fn create_and_find_preserves_prices() {
        let pool = setup_pool().await;
        let repo = SqlProductRepository::new(pool.clone());

        let created = repo.create(&sample_product("Jus de pomme")).await.expect("create product");
        let found =
            repo.find_by_id(created.id).await.expect("find product").expect("product present");

        assert_eq!(found.purchase_price, Decimal::new(250, 2));
        assert_eq!(found.sale_price, Decimal::new(450, 2));
        assert_eq!(found.quantity_on_hand, 10);
        assert_eq!(found.alert_threshold, 5);

        pool.close().await;
    }

    #[tokio::test]
    async fn update_does_not_touch_on_hand_quantity() {
        let pool = setup_pool().await;
        let repo = SqlProductRepository::new(pool.clone());

        let created = repo.create(&sample_product("Jus d'orange")).await.expect("create product");

        let updated = repo
            .update(
                created.id,
                &ProductUpdate {
                    name: "Jus d'orange pressée".to_string(),
                    description: None,
                    category_id: None,
                    supplier_id: None,
                    purchase_price: Decimal::new(300, 2),
                    sale_price: Decimal::new(550, 2),
                    alert_threshold: 8,
                },
            )
            .await
            .expect("update product");

        assert_eq!(updated.name, "Jus d'orange pressée");
        assert_eq!(updated.sale_price, Decimal::new(550, 2));
        assert_eq!(updated.quantity_on_hand, 10, "stock must only move through transactions");

        pool.close().await;
    }

    #[tokio::test]
    async fn deleting_a_product_referenced_by_a_line_is_rejected() {
        let pool = setup_pool().await;
        let repo = SqlProductRepository::new(pool.clone());

        let product = repo.create(&sample_product("Sirop de menthe")).await.expect("create");
        insert_sale_with_line(&pool, product.id.0).await;

        let error = repo.delete(product.id).await.expect_err("delete should be rejected");
        assert!(matches!(error, RepositoryError::ReferencedRow { entity: "product", .. }));

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn insert_sale_with_line(pool: &DbPool, product_id: i64) {
        let timestamp = "2026-03-01T10:00:00Z";
        sqlx::query("INSERT INTO client (name, created_at) VALUES ('Client test', ?)")
            .bind(timestamp)
            .execute(pool)
            .await
            .expect("insert client");

        let header = sqlx::query(
            "INSERT INTO stock_txn (kind, client_id, total, occurred_at, created_at)
             VALUES ('sale', 1, '4.50', ?, ?)",
        )
        .bind(timestamp)
        .bind(timestamp)
        .execute(pool)
        .await
        .expect("insert header");

        sqlx::query(
            "INSERT INTO stock_txn_line (txn_id, product_id, quantity, unit_price, line_total)
             VALUES (?, ?, 1, '4.50', '4.50')",
        )
        .bind(header.last_insert_rowid())
        .bind(product_id)
        .execute(pool)
        .await
        .expect("insert line");
    }
}
