use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use comptoir_core::domain::client::{Client, ClientId, NewClient};

use super::{map_fk_violation, parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewClient) -> Result<Client, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO client (name, email, phone, address, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.address.as_deref())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Client {
            id: ClientId(result.last_insert_rowid()),
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, email, phone, address, created_at
             FROM client
             ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(client_from_row).collect()
    }

    pub async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, address, created_at
             FROM client
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(client_from_row).transpose()
    }

    pub async fn update(&self, id: ClientId, input: &NewClient) -> Result<Client, RepositoryError> {
        let result = sqlx::query(
            "UPDATE client SET name = ?, email = ?, phone = ?, address = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.address.as_deref())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "client", id: id.0 });
        }

        self.find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound { entity: "client", id: id.0 })
    }

    pub async fn delete(&self, id: ClientId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM client WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|error| map_fk_violation(error, "client", id.0))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "client", id: id.0 });
        }

        Ok(())
    }
}

fn client_from_row(row: SqliteRow) -> Result<Client, RepositoryError> {
    Ok(Client {
        id: ClientId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
