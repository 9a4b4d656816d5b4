use std::sync::Arc;

use comptoir_db::repositories::{SqlStockTransactionRepository, StockTransactionRepository};
use comptoir_db::DbPool;

/// Shared handler state. The stock transaction core is held behind its trait;
/// everything else reaches the pool through per-request repositories.
#[derive(Clone)]
pub struct ApiState {
    pub db_pool: DbPool,
    pub transactions: Arc<dyn StockTransactionRepository>,
}

impl ApiState {
    pub fn new(db_pool: DbPool) -> Self {
        let transactions: Arc<dyn StockTransactionRepository> =
            Arc::new(SqlStockTransactionRepository::new(db_pool.clone()));
        Self { db_pool, transactions }
    }
}
