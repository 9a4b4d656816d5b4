//! Sales ("ventes") and purchases ("achats") endpoints.
//!
//! - `POST   /api/ventes`        — record a sale and decrement stock
//! - `GET    /api/ventes`        — list sales with the client name
//! - `GET    /api/ventes/{id}`   — one sale with its line items
//! - `DELETE /api/ventes/{id}`   — reverse a sale and restore stock
//! - `POST   /api/achats`        — record a purchase and increment stock
//! - `GET    /api/achats`        — list purchases with the supplier name
//! - `GET    /api/achats/{id}`   — one purchase with its line items
//! - `DELETE /api/achats/{id}`   — reverse a purchase and restore stock
//!
//! The wire format keeps the field names the frontend speaks (`produits`,
//! `quantite`, `prix_unitaire`, ...); everything behind the boundary is the
//! typed domain model.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use comptoir_core::domain::client::ClientId;
use comptoir_core::domain::product::ProductId;
use comptoir_core::domain::supplier::SupplierId;
use comptoir_core::domain::transaction::{
    Counterparty, NewTransaction, NewTransactionLine, TransactionDetail, TransactionId,
    TransactionKind, TransactionSummary,
};
use comptoir_core::domain::user::UserId;
use comptoir_core::errors::{ApplicationError, DomainError};

use crate::respond::{error_response, ApiError, MessageResponse};
use crate::state::ApiState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub client_id: i64,
    pub total: Decimal,
    pub date_vente: Option<String>,
    pub utilisateur_id: Option<i64>,
    pub produits: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub fournisseur_id: i64,
    pub total: Decimal,
    pub date_achat: Option<String>,
    pub utilisateur_id: Option<i64>,
    pub produits: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub produit_id: i64,
    pub quantite: u32,
    pub prix_unitaire: Decimal,
    /// Accepted for wire compatibility; the stored line total is always
    /// recomputed from quantity and unit price.
    #[serde(default)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CreateSaleResponse {
    pub message: String,
    #[serde(rename = "venteId")]
    pub vente_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreatePurchaseResponse {
    pub message: String,
    pub achat_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SaleSummaryResponse {
    pub id: i64,
    pub client: String,
    pub total: Decimal,
    pub date_vente: String,
    pub utilisateur_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseSummaryResponse {
    pub id: i64,
    pub fournisseur: String,
    pub total: Decimal,
    pub date_achat: String,
    pub utilisateur_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub produit_id: i64,
    pub nom_produit: String,
    pub quantite: u32,
    pub prix_unitaire: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SaleDetailResponse {
    pub id: i64,
    pub client_id: i64,
    pub client: String,
    pub total: Decimal,
    pub date_vente: String,
    pub utilisateur_id: Option<i64>,
    pub produits: Vec<LineItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseDetailResponse {
    pub id: i64,
    pub fournisseur_id: i64,
    pub fournisseur: String,
    pub total: Decimal,
    pub date_achat: String,
    pub utilisateur_id: Option<i64>,
    pub produits: Vec<LineItemResponse>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/ventes", post(create_sale).get(list_sales))
        .route("/api/ventes/{id}", get(fetch_sale).delete(delete_sale))
        .route("/api/achats", post(create_purchase).get(list_purchases))
        .route("/api/achats/{id}", get(fetch_purchase).delete(delete_purchase))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn create_sale(
    State(state): State<ApiState>,
    Json(request): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<CreateSaleResponse>), ApiError> {
    let occurred_at = parse_occurred_at(request.date_vente.as_deref()).map_err(error_response)?;

    let input = NewTransaction {
        kind: TransactionKind::Sale,
        counterparty: Counterparty::Client(ClientId(request.client_id)),
        occurred_at,
        total: request.total,
        recorded_by: request.utilisateur_id.map(UserId),
        lines: wire_lines(&request.produits),
    };

    let id = state.transactions.record(&input).await.map_err(error_response)?;
    info!(event_name = "api.sale.recorded", sale_id = id.0, "sale recorded");

    Ok((
        StatusCode::CREATED,
        Json(CreateSaleResponse { message: "Vente enregistrée".to_string(), vente_id: id.0 }),
    ))
}

pub async fn create_purchase(
    State(state): State<ApiState>,
    Json(request): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<CreatePurchaseResponse>), ApiError> {
    let occurred_at = parse_occurred_at(request.date_achat.as_deref()).map_err(error_response)?;

    let input = NewTransaction {
        kind: TransactionKind::Purchase,
        counterparty: Counterparty::Supplier(SupplierId(request.fournisseur_id)),
        occurred_at,
        total: request.total,
        recorded_by: request.utilisateur_id.map(UserId),
        lines: wire_lines(&request.produits),
    };

    let id = state.transactions.record(&input).await.map_err(error_response)?;
    info!(event_name = "api.purchase.recorded", purchase_id = id.0, "purchase recorded");

    Ok((
        StatusCode::CREATED,
        Json(CreatePurchaseResponse { message: "Achat enregistré".to_string(), achat_id: id.0 }),
    ))
}

pub async fn list_sales(
    State(state): State<ApiState>,
) -> Result<Json<Vec<SaleSummaryResponse>>, ApiError> {
    let summaries =
        state.transactions.list(TransactionKind::Sale).await.map_err(error_response)?;
    Ok(Json(summaries.into_iter().map(sale_summary_response).collect()))
}

pub async fn list_purchases(
    State(state): State<ApiState>,
) -> Result<Json<Vec<PurchaseSummaryResponse>>, ApiError> {
    let summaries =
        state.transactions.list(TransactionKind::Purchase).await.map_err(error_response)?;
    Ok(Json(summaries.into_iter().map(purchase_summary_response).collect()))
}

pub async fn fetch_sale(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<SaleDetailResponse>, ApiError> {
    let detail = state
        .transactions
        .fetch(TransactionKind::Sale, TransactionId(id))
        .await
        .map_err(error_response)?;
    Ok(Json(sale_detail_response(detail)))
}

pub async fn fetch_purchase(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<PurchaseDetailResponse>, ApiError> {
    let detail = state
        .transactions
        .fetch(TransactionKind::Purchase, TransactionId(id))
        .await
        .map_err(error_response)?;
    Ok(Json(purchase_detail_response(detail)))
}

pub async fn delete_sale(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .transactions
        .reverse(TransactionKind::Sale, TransactionId(id))
        .await
        .map_err(error_response)?;
    info!(event_name = "api.sale.reversed", sale_id = id, "sale reversed");
    Ok(Json(MessageResponse { message: "Vente supprimée et stock restauré".to_string() }))
}

pub async fn delete_purchase(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .transactions
        .reverse(TransactionKind::Purchase, TransactionId(id))
        .await
        .map_err(error_response)?;
    info!(event_name = "api.purchase.reversed", purchase_id = id, "purchase reversed");
    Ok(Json(MessageResponse { message: "Achat supprimé et stock ajusté".to_string() }))
}

// ---------------------------------------------------------------------------
// Wire mapping
// ---------------------------------------------------------------------------

fn wire_lines(produits: &[LineItemRequest]) -> Vec<NewTransactionLine> {
    produits
        .iter()
        .map(|line| NewTransactionLine {
            product_id: ProductId(line.produit_id),
            quantity: line.quantite,
            unit_price: line.prix_unitaire,
        })
        .collect()
}

/// The frontend sends either a full RFC 3339 timestamp or a bare
/// `YYYY-MM-DD`; an absent or blank date means "now".
fn parse_occurred_at(raw: Option<&str>) -> Result<DateTime<Utc>, ApplicationError> {
    let Some(raw) = raw else { return Ok(Utc::now()) };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Utc::now());
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    Err(ApplicationError::Domain(DomainError::InvariantViolation(format!(
        "unparseable transaction date `{trimmed}`"
    ))))
}

fn sale_summary_response(summary: TransactionSummary) -> SaleSummaryResponse {
    SaleSummaryResponse {
        id: summary.id.0,
        client: summary.counterparty_name,
        total: summary.total,
        date_vente: summary.occurred_at.to_rfc3339(),
        utilisateur_id: summary.recorded_by.map(|user| user.0),
    }
}

fn purchase_summary_response(summary: TransactionSummary) -> PurchaseSummaryResponse {
    PurchaseSummaryResponse {
        id: summary.id.0,
        fournisseur: summary.counterparty_name,
        total: summary.total,
        date_achat: summary.occurred_at.to_rfc3339(),
        utilisateur_id: summary.recorded_by.map(|user| user.0),
    }
}

fn line_item_responses(detail: &TransactionDetail) -> Vec<LineItemResponse> {
    detail
        .lines
        .iter()
        .map(|line| LineItemResponse {
            produit_id: line.product_id.0,
            nom_produit: line.product_name.clone(),
            quantite: line.quantity,
            prix_unitaire: line.unit_price,
            total: line.line_total,
        })
        .collect()
}

fn sale_detail_response(detail: TransactionDetail) -> SaleDetailResponse {
    let produits = line_item_responses(&detail);
    SaleDetailResponse {
        id: detail.id.0,
        client_id: detail.counterparty_id,
        client: detail.counterparty_name,
        total: detail.total,
        date_vente: detail.occurred_at.to_rfc3339(),
        utilisateur_id: detail.recorded_by.map(|user| user.0),
        produits,
    }
}

fn purchase_detail_response(detail: TransactionDetail) -> PurchaseDetailResponse {
    let produits = line_item_responses(&detail);
    PurchaseDetailResponse {
        id: detail.id.0,
        fournisseur_id: detail.counterparty_id,
        fournisseur: detail.counterparty_name,
        total: detail.total,
        date_achat: detail.occurred_at.to_rfc3339(),
        utilisateur_id: detail.recorded_by.map(|user| user.0),
        produits,
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        Json,
    };
    use rust_decimal::Decimal;

    use comptoir_db::{connect_with_settings, migrations, DbPool};

    use super::{
        create_sale, delete_sale, fetch_sale, list_sales, parse_occurred_at, CreateSaleRequest,
        LineItemRequest,
    };
    use crate::state::ApiState;

    #[tokio::test]
    async fn create_sale_records_and_decrements_stock() {
        let state = setup_state().await;
        seed_client_and_product(&state.db_pool, 10).await;

        let (status, Json(response)) = create_sale(
            State(state.clone()),
            Json(CreateSaleRequest {
                client_id: 1,
                total: Decimal::new(30_000, 2),
                date_vente: Some("2026-03-02".to_string()),
                utilisateur_id: None,
                produits: vec![LineItemRequest {
                    produit_id: 1,
                    quantite: 3,
                    prix_unitaire: Decimal::new(10_000, 2),
                    total: None,
                }],
            }),
        )
        .await
        .expect("sale should be recorded");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.message, "Vente enregistrée");

        let on_hand: i64 = sqlx::query_scalar("SELECT quantity_on_hand FROM product WHERE id = 1")
            .fetch_one(&state.db_pool)
            .await
            .expect("read stock");
        assert_eq!(on_hand, 7);

        let Json(detail) = fetch_sale(State(state.clone()), Path(response.vente_id))
            .await
            .expect("fetch recorded sale");
        assert_eq!(detail.client, "Café de la Place");
        assert_eq!(detail.produits.len(), 1);
        assert_eq!(detail.produits[0].quantite, 3);

        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn zero_quantity_line_is_a_bad_request_and_writes_nothing() {
        let state = setup_state().await;
        seed_client_and_product(&state.db_pool, 10).await;

        let (status, _) = create_sale(
            State(state.clone()),
            Json(CreateSaleRequest {
                client_id: 1,
                total: Decimal::ZERO,
                date_vente: None,
                utilisateur_id: None,
                produits: vec![LineItemRequest {
                    produit_id: 1,
                    quantite: 0,
                    prix_unitaire: Decimal::new(10_000, 2),
                    total: None,
                }],
            }),
        )
        .await
        .expect_err("zero quantity must be rejected");

        assert_eq!(status, StatusCode::BAD_REQUEST);

        let headers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_txn")
            .fetch_one(&state.db_pool)
            .await
            .expect("count headers");
        assert_eq!(headers, 0);

        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn oversell_maps_to_conflict() {
        let state = setup_state().await;
        seed_client_and_product(&state.db_pool, 2).await;

        let (status, _) = create_sale(
            State(state.clone()),
            Json(CreateSaleRequest {
                client_id: 1,
                total: Decimal::new(30_000, 2),
                date_vente: None,
                utilisateur_id: None,
                produits: vec![LineItemRequest {
                    produit_id: 1,
                    quantite: 3,
                    prix_unitaire: Decimal::new(10_000, 2),
                    total: None,
                }],
            }),
        )
        .await
        .expect_err("oversell must be rejected");

        assert_eq!(status, StatusCode::CONFLICT);

        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn delete_round_trip_restores_stock_and_listing_is_empty() {
        let state = setup_state().await;
        seed_client_and_product(&state.db_pool, 10).await;

        let (_, Json(created)) = create_sale(
            State(state.clone()),
            Json(CreateSaleRequest {
                client_id: 1,
                total: Decimal::new(10_000, 2),
                date_vente: None,
                utilisateur_id: None,
                produits: vec![LineItemRequest {
                    produit_id: 1,
                    quantite: 1,
                    prix_unitaire: Decimal::new(10_000, 2),
                    total: None,
                }],
            }),
        )
        .await
        .expect("record sale");

        delete_sale(State(state.clone()), Path(created.vente_id)).await.expect("reverse sale");

        let on_hand: i64 = sqlx::query_scalar("SELECT quantity_on_hand FROM product WHERE id = 1")
            .fetch_one(&state.db_pool)
            .await
            .expect("read stock");
        assert_eq!(on_hand, 10);

        let Json(sales) = list_sales(State(state.clone())).await.expect("list sales");
        assert!(sales.is_empty());

        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn deleting_an_unknown_sale_is_not_found() {
        let state = setup_state().await;

        let (status, _) = delete_sale(State(state.clone()), Path(4242))
            .await
            .expect_err("unknown sale id");
        assert_eq!(status, StatusCode::NOT_FOUND);

        state.db_pool.close().await;
    }

    #[test]
    fn occurred_at_accepts_rfc3339_bare_dates_and_blank() {
        let rfc = parse_occurred_at(Some("2026-03-02T08:30:00Z")).expect("rfc3339");
        assert_eq!(rfc.to_rfc3339(), "2026-03-02T08:30:00+00:00");

        let bare = parse_occurred_at(Some("2026-03-02")).expect("bare date");
        assert_eq!(bare.to_rfc3339(), "2026-03-02T00:00:00+00:00");

        parse_occurred_at(None).expect("absent date defaults to now");
        parse_occurred_at(Some("  ")).expect("blank date defaults to now");
        parse_occurred_at(Some("02/03/2026")).expect_err("unsupported format");
    }

    async fn setup_state() -> ApiState {
        let pool: DbPool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        ApiState::new(pool)
    }

    async fn seed_client_and_product(pool: &DbPool, on_hand: i64) {
        sqlx::query(
            "INSERT INTO client (id, name, created_at)
             VALUES (1, 'Café de la Place', '2026-03-01T10:00:00Z')",
        )
        .execute(pool)
        .await
        .expect("insert client");

        sqlx::query(
            "INSERT INTO product (id, name, purchase_price, sale_price, quantity_on_hand, alert_threshold, created_at)
             VALUES (1, 'Jus de pomme', '1.80', '3.50', ?, 5, '2026-03-01T10:00:00Z')",
        )
        .bind(on_hand)
        .execute(pool)
        .await
        .expect("insert product");
    }
}
