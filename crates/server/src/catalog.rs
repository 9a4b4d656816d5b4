//! Category and product endpoints.
//!
//! - `GET/POST        /api/categories`
//! - `GET/PUT/DELETE  /api/categories/{id}`
//! - `GET/POST        /api/produits`
//! - `GET/PUT/DELETE  /api/produits/{id}`
//!
//! Product stock is read-only here; on-hand quantity only moves through the
//! sale/purchase endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use comptoir_core::domain::category::{Category, CategoryId, NewCategory};
use comptoir_core::domain::product::{NewProduct, Product, ProductId, ProductUpdate};
use comptoir_core::domain::supplier::SupplierId;
use comptoir_core::errors::ApplicationError;

use comptoir_db::repositories::{SqlCategoryRepository, SqlProductRepository};

use crate::respond::{error_response, ApiError, MessageResponse};
use crate::state::ApiState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub nom: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub nom: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub nom: String,
    pub description: Option<String>,
    pub categorie_id: Option<i64>,
    pub fournisseur_id: Option<i64>,
    pub prix_achat: Decimal,
    pub prix_vente: Decimal,
    /// Initial stock on creation; ignored on update, where stock is owned by
    /// the transaction ledger.
    #[serde(default)]
    pub quantite_en_stock: Option<i64>,
    pub seuil_alerte: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub nom: String,
    pub description: Option<String>,
    pub categorie_id: Option<i64>,
    pub fournisseur_id: Option<i64>,
    pub prix_achat: Decimal,
    pub prix_vente: Decimal,
    pub quantite_en_stock: i64,
    pub seuil_alerte: i64,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            get(fetch_category).put(update_category).delete(delete_category),
        )
        .route("/api/produits", get(list_products).post(create_product))
        .route("/api/produits/{id}", get(fetch_product).put(update_product).delete(delete_product))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Category handlers
// ---------------------------------------------------------------------------

pub async fn create_category(
    State(state): State<ApiState>,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let repo = SqlCategoryRepository::new(state.db_pool.clone());
    let category = repo
        .create(&NewCategory { name: request.nom, description: request.description })
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(category_response(category))))
}

pub async fn list_categories(
    State(state): State<ApiState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let repo = SqlCategoryRepository::new(state.db_pool.clone());
    let categories = repo.list().await.map_err(error_response)?;
    Ok(Json(categories.into_iter().map(category_response).collect()))
}

pub async fn fetch_category(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let repo = SqlCategoryRepository::new(state.db_pool.clone());
    let category = repo
        .find_by_id(CategoryId(id))
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(ApplicationError::NotFound(format!("category {id}"))))?;
    Ok(Json(category_response(category)))
}

pub async fn update_category(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let repo = SqlCategoryRepository::new(state.db_pool.clone());
    let category = repo
        .update(CategoryId(id), &NewCategory { name: request.nom, description: request.description })
        .await
        .map_err(error_response)?;
    Ok(Json(category_response(category)))
}

pub async fn delete_category(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = SqlCategoryRepository::new(state.db_pool.clone());
    repo.delete(CategoryId(id)).await.map_err(error_response)?;
    Ok(Json(MessageResponse { message: "Catégorie supprimée".to_string() }))
}

// ---------------------------------------------------------------------------
// Product handlers
// ---------------------------------------------------------------------------

pub async fn create_product(
    State(state): State<ApiState>,
    Json(request): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let repo = SqlProductRepository::new(state.db_pool.clone());
    let product = repo
        .create(&NewProduct {
            name: request.nom,
            description: request.description,
            category_id: request.categorie_id.map(CategoryId),
            supplier_id: request.fournisseur_id.map(SupplierId),
            purchase_price: request.prix_achat,
            sale_price: request.prix_vente,
            quantity_on_hand: request.quantite_en_stock.unwrap_or(0),
            alert_threshold: request.seuil_alerte,
        })
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(product_response(product))))
}

pub async fn list_products(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let repo = SqlProductRepository::new(state.db_pool.clone());
    let products = repo.list().await.map_err(error_response)?;
    Ok(Json(products.into_iter().map(product_response).collect()))
}

pub async fn fetch_product(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let repo = SqlProductRepository::new(state.db_pool.clone());
    let product = repo
        .find_by_id(ProductId(id))
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(ApplicationError::NotFound(format!("product {id}"))))?;
    Ok(Json(product_response(product)))
}

pub async fn update_product(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let repo = SqlProductRepository::new(state.db_pool.clone());
    let product = repo
        .update(
            ProductId(id),
            &ProductUpdate {
                name: request.nom,
                description: request.description,
                category_id: request.categorie_id.map(CategoryId),
                supplier_id: request.fournisseur_id.map(SupplierId),
                purchase_price: request.prix_achat,
                sale_price: request.prix_vente,
                alert_threshold: request.seuil_alerte,
            },
        )
        .await
        .map_err(error_response)?;
    Ok(Json(product_response(product)))
}

pub async fn delete_product(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = SqlProductRepository::new(state.db_pool.clone());
    repo.delete(ProductId(id)).await.map_err(error_response)?;
    Ok(Json(MessageResponse { message: "Produit supprimé".to_string() }))
}

// ---------------------------------------------------------------------------
// Wire mapping
// ---------------------------------------------------------------------------

fn category_response(category: Category) -> CategoryResponse {
    CategoryResponse {
        id: category.id.0,
        nom: category.name,
        description: category.description,
    }
}

fn product_response(product: Product) -> ProductResponse {
    ProductResponse {
        id: product.id.0,
        nom: product.name,
        description: product.description,
        categorie_id: product.category_id.map(|category| category.0),
        fournisseur_id: product.supplier_id.map(|supplier| supplier.0),
        prix_achat: product.purchase_price,
        prix_vente: product.sale_price,
        quantite_en_stock: product.quantity_on_hand,
        seuil_alerte: product.alert_threshold,
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
        create_product, delete_product, fetch_product, update_product, ProductRequest,
    };
    use crate::state::ApiState;

    fn product_request(nom: &str, stock: Option<i64>) -> ProductRequest {
        ProductRequest {
            nom: nom.to_string(),
            description: None,
            categorie_id: None,
            fournisseur_id: None,
            prix_achat: Decimal::new(180, 2),
            prix_vente: Decimal::new(350, 2),
            quantite_en_stock: stock,
            seuil_alerte: 5,
        }
    }

    #[tokio::test]
    async fn product_create_update_keeps_stock_under_ledger_control() {
        let state = setup_state().await;

        let (status, Json(created)) =
            create_product(State(state.clone()), Json(product_request("Jus de pomme", Some(12))))
                .await
                .expect("create product");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.quantite_en_stock, 12);

        // An update claiming a different stock level must not change it.
        let Json(updated) = update_product(
            State(state.clone()),
            Path(created.id),
            Json(product_request("Jus de pomme bio", Some(999))),
        )
        .await
        .expect("update product");
        assert_eq!(updated.nom, "Jus de pomme bio");
        assert_eq!(updated.quantite_en_stock, 12);

        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn fetching_an_unknown_product_is_not_found() {
        let state = setup_state().await;

        let (status, _) =
            fetch_product(State(state.clone()), Path(777)).await.expect_err("unknown product");
        assert_eq!(status, StatusCode::NOT_FOUND);

        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn deleting_a_product_with_transaction_history_is_a_conflict() {
        let state = setup_state().await;

        let (_, Json(created)) =
            create_product(State(state.clone()), Json(product_request("Sirop", Some(5))))
                .await
                .expect("create product");

        sqlx::query(
            "INSERT INTO client (id, name, created_at) VALUES (1, 'Client', '2026-03-01T10:00:00Z')",
        )
        .execute(&state.db_pool)
        .await
        .expect("insert client");
        sqlx::query(
            "INSERT INTO stock_txn (id, kind, client_id, total, occurred_at, created_at)
             VALUES (1, 'sale', 1, '3.50', '2026-03-01T10:00:00Z', '2026-03-01T10:00:00Z')",
        )
        .execute(&state.db_pool)
        .await
        .expect("insert header");
        sqlx::query(
            "INSERT INTO stock_txn_line (txn_id, product_id, quantity, unit_price, line_total)
             VALUES (1, ?, 1, '3.50', '3.50')",
        )
        .bind(created.id)
        .execute(&state.db_pool)
        .await
        .expect("insert line");

        let (status, _) = delete_product(State(state.clone()), Path(created.id))
            .await
            .expect_err("referenced product");
        assert_eq!(status, StatusCode::CONFLICT);

        state.db_pool.close().await;
    }

    async fn setup_state() -> ApiState {
        let pool: DbPool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        ApiState::new(pool)
    }
}
