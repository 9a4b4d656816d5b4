//! Dashboard statistics endpoint: `GET /api/stats`.
//!
//! Counts and amounts come from the stats repository; the low-stock list
//! comes from the stock transaction repository's threshold report so there is
//! a single source for the rule.

use axum::{extract::State, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;

use comptoir_db::repositories::SqlStatsRepository;

use crate::respond::{error_response, ApiError};
use crate::state::ApiState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(rename = "totalClients")]
    pub total_clients: i64,
    #[serde(rename = "totalProduits")]
    pub total_products: i64,
    #[serde(rename = "totalVentes")]
    pub total_sales: i64,
    #[serde(rename = "totalAchats")]
    pub total_purchases: i64,
    #[serde(rename = "montantTotalVentes")]
    pub sales_amount: Decimal,
    #[serde(rename = "montantTotalAchats")]
    pub purchases_amount: Decimal,
    #[serde(rename = "topProduits")]
    pub top_products: Vec<TopProductResponse>,
    #[serde(rename = "produitsFaibles")]
    pub low_stock: Vec<LowStockResponse>,
}

#[derive(Debug, Serialize)]
pub struct TopProductResponse {
    pub nom: String,
    pub quantite_vendue: i64,
}

#[derive(Debug, Serialize)]
pub struct LowStockResponse {
    pub nom: String,
    pub quantite_en_stock: i64,
    pub seuil_alerte: i64,
}

pub fn router(state: ApiState) -> Router {
    Router::new().route("/api/stats", get(stats)).with_state(state)
}

pub async fn stats(State(state): State<ApiState>) -> Result<Json<StatsResponse>, ApiError> {
    let counts = SqlStatsRepository::new(state.db_pool.clone())
        .dashboard()
        .await
        .map_err(error_response)?;
    let low_stock = state.transactions.low_stock().await.map_err(error_response)?;

    Ok(Json(StatsResponse {
        total_clients: counts.total_clients,
        total_products: counts.total_products,
        total_sales: counts.total_sales,
        total_purchases: counts.total_purchases,
        sales_amount: counts.sales_amount,
        purchases_amount: counts.purchases_amount,
        top_products: counts
            .top_products
            .into_iter()
            .map(|product| TopProductResponse {
                nom: product.name,
                quantite_vendue: product.quantity_sold,
            })
            .collect(),
        low_stock: low_stock
            .into_iter()
            .map(|product| LowStockResponse {
                nom: product.name,
                quantite_en_stock: product.quantity_on_hand,
                seuil_alerte: product.alert_threshold,
            })
            .collect(),
    }))
}
