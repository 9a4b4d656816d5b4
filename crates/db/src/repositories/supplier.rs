use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use comptoir_core::domain::supplier::{NewSupplier, Supplier, SupplierId};

use super::{map_fk_violation, parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlSupplierRepository {
    pool: DbPool,
}

impl SqlSupplierRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewSupplier) -> Result<Supplier, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO supplier (name, email, phone, address, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.address.as_deref())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Supplier {
            id: SupplierId(result.last_insert_rowid()),
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, email, phone, address, created_at
             FROM supplier
             ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(supplier_from_row).collect()
    }

    pub async fn find_by_id(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, address, created_at
             FROM supplier
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(supplier_from_row).transpose()
    }

    pub async fn update(
        &self,
        id: SupplierId,
        input: &NewSupplier,
    ) -> Result<Supplier, RepositoryError> {
        let result = sqlx::query(
            "UPDATE supplier SET name = ?, email = ?, phone = ?, address = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.address.as_deref())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "supplier", id: id.0 });
        }

        self.find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound { entity: "supplier", id: id.0 })
    }

    pub async fn delete(&self, id: SupplierId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM supplier WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|error| map_fk_violation(error, "supplier", id.0))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "supplier", id: id.0 });
        }

        Ok(())
    }
}

fn supplier_from_row(row: SqliteRow) -> Result<Supplier, RepositoryError> {
    Ok(Supplier {
        id: SupplierId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use comptoir_core::domain::supplier::NewSupplier;

    use super::SqlSupplierRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    #[tokio::test]
    async fn create_and_list_round_trip() {
        let pool = setup_pool().await;
        let repo = SqlSupplierRepository::new(pool.clone());

        let created = repo
            .create(&NewSupplier {
                name: "Grossiste Nord".to_string(),
                email: Some("ventes@grossiste-nord.example".to_string()),
                phone: Some("+33 3 20 00 00 00".to_string()),
                address: None,
            })
            .await
            .expect("create supplier");

        let listed = repo.list().await.expect("list suppliers");
        assert_eq!(listed, vec![created]);

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }
}
