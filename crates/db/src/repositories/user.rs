use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use comptoir_core::domain::user::{NewUser, User, UserId, UserRole};

use super::{map_unique_violation, parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewUser) -> Result<User, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO app_user (username, display_name, role, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&input.username)
        .bind(&input.display_name)
        .bind(input.role.as_str())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_violation(error, "user", &input.username))?;

        Ok(User {
            id: UserId(result.last_insert_rowid()),
            username: input.username.clone(),
            display_name: input.display_name.clone(),
            role: input.role,
            created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, username, display_name, role, created_at
             FROM app_user
             ORDER BY username ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(user_from_row).collect()
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, display_name, role, created_at FROM app_user WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    pub async fn update(&self, id: UserId, input: &NewUser) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "UPDATE app_user SET username = ?, display_name = ?, role = ? WHERE id = ?",
        )
        .bind(&input.username)
        .bind(&input.display_name)
        .bind(input.role.as_str())
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_violation(error, "user", &input.username))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "user", id: id.0 });
        }

        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound { entity: "user", id: id.0 })
    }

    /// Transactions recorded by the user keep their history; the schema sets
    /// `stock_txn.recorded_by` to NULL on user deletion.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM app_user WHERE id = ?").bind(id.0).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "user", id: id.0 });
        }

        Ok(())
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    let role_raw = row.try_get::<String, _>("role")?;
    let role = UserRole::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown user role `{role_raw}`")))?;

    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        role,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
