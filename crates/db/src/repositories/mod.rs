use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use comptoir_core::domain::product::{LowStockProduct, ProductId};
use comptoir_core::domain::transaction::{
    NewTransaction, TransactionDetail, TransactionId, TransactionKind, TransactionSummary,
};
use comptoir_core::errors::{ApplicationError, DomainError};

pub mod category;
pub mod client;
pub mod product;
pub mod stats;
pub mod stock_txn;
pub mod supplier;
pub mod user;

pub use category::SqlCategoryRepository;
pub use client::SqlClientRepository;
pub use product::SqlProductRepository;
pub use stats::{DashboardCounts, SqlStatsRepository, TopProduct};
pub use stock_txn::SqlStockTransactionRepository;
pub use supplier::SqlSupplierRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{entity} `{value}` already exists")]
    Duplicate { entity: &'static str, value: String },
    #[error("{entity} {id} is referenced by existing records")]
    ReferencedRow { entity: &'static str, id: i64 },
}

/// Failures of the stock transaction core. Every variant raised inside
/// `record`/`reverse` aborts the whole enclosing database transaction.
#[derive(Debug, Error)]
pub enum StockTxnError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("product not found: {0:?}")]
    ProductNotFound(ProductId),
    #[error("insufficient stock for product {product:?}: {on_hand} on hand, change {delta}")]
    InsufficientStock { product: ProductId, on_hand: i64, delta: i64 },
    #[error("transaction not found: {0:?}")]
    NotFound(TransactionId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StockTxnError {
    fn from(value: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(value))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        let message = value.to_string();
        match value {
            RepositoryError::NotFound { .. } => Self::NotFound(message),
            RepositoryError::Duplicate { .. } | RepositoryError::ReferencedRow { .. } => {
                Self::Conflict(message)
            }
            RepositoryError::Database(_) | RepositoryError::Decode(_) => Self::Persistence(message),
        }
    }
}

impl From<StockTxnError> for ApplicationError {
    fn from(value: StockTxnError) -> Self {
        let message = value.to_string();
        match value {
            StockTxnError::Domain(error) => Self::Domain(error),
            StockTxnError::ProductNotFound(_) | StockTxnError::NotFound(_) => {
                Self::NotFound(message)
            }
            StockTxnError::InsufficientStock { .. } => Self::Conflict(message),
            StockTxnError::Repository(error) => Self::from(error),
        }
    }
}

/// Storage seam for the sale/purchase transaction core. Exactly one SQL
/// implementation exists; engine specifics stay behind this trait and the
/// connection layer.
#[async_trait]
pub trait StockTransactionRepository: Send + Sync {
    /// Persists a header and its lines and applies every stock delta, all or
    /// nothing, returning the generated transaction id.
    async fn record(&self, input: &NewTransaction) -> Result<TransactionId, StockTxnError>;

    /// Undoes a recorded transaction: restores stock for every line, then
    /// removes the lines and the header, all or nothing.
    async fn reverse(&self, kind: TransactionKind, id: TransactionId)
        -> Result<(), StockTxnError>;

    async fn list(&self, kind: TransactionKind) -> Result<Vec<TransactionSummary>, StockTxnError>;

    async fn fetch(
        &self,
        kind: TransactionKind,
        id: TransactionId,
    ) -> Result<TransactionDetail, StockTxnError>;

    /// Products at or below their alert threshold. Read-only.
    async fn low_stock(&self) -> Result<Vec<LowStockProduct>, StockTxnError>;
}

pub(crate) fn map_unique_violation(
    error: sqlx::Error,
    entity: &'static str,
    value: &str,
) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Duplicate { entity, value: value.to_string() }
        }
        _ => RepositoryError::Database(error),
    }
}

pub(crate) fn map_fk_violation(
    error: sqlx::Error,
    entity: &'static str,
    id: i64,
) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            RepositoryError::ReferencedRow { entity, id }
        }
        _ => RepositoryError::Database(error),
    }
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_quantity(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}
