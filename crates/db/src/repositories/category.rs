use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use comptoir_core::domain::category::{Category, CategoryId, NewCategory};

use super::{map_unique_violation, parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlCategoryRepository {
    pool: DbPool,
}

impl SqlCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewCategory) -> Result<Category, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO category (name, description, created_at) VALUES (?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_violation(error, "category", &input.name))?;

        Ok(Category {
            id: CategoryId(result.last_insert_rowid()),
            name: input.name.clone(),
            description: input.description.clone(),
            created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at FROM category ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(category_from_row).collect()
    }

    pub async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, description, created_at FROM category WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(category_from_row).transpose()
    }

    pub async fn update(
        &self,
        id: CategoryId,
        input: &NewCategory,
    ) -> Result<Category, RepositoryError> {
        let result = sqlx::query("UPDATE category SET name = ?, description = ? WHERE id = ?")
            .bind(&input.name)
            .bind(input.description.as_deref())
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|error| map_unique_violation(error, "category", &input.name))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "category", id: id.0 });
        }

        self.find_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound { entity: "category", id: id.0 })
    }

    /// Products referencing the category fall back to NULL (schema-level
    /// `ON DELETE SET NULL`), so category deletion never cascades or blocks.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM category WHERE id = ?").bind(id.0).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "category", id: id.0 });
        }

        Ok(())
    }
}

fn category_from_row(row: SqliteRow) -> Result<Category, RepositoryError> {
    Ok(Category {
        id: CategoryId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
