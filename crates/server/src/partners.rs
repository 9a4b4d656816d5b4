//! Client, supplier, and user endpoints.
//!
//! - `GET/POST        /api/clients`          `GET/PUT/DELETE /api/clients/{id}`
//! - `GET/POST        /api/fournisseurs`     `GET/PUT/DELETE /api/fournisseurs/{id}`
//! - `GET/POST        /api/utilisateurs`     `GET/PUT/DELETE /api/utilisateurs/{id}`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use comptoir_core::domain::client::{Client, ClientId, NewClient};
use comptoir_core::domain::supplier::{NewSupplier, Supplier, SupplierId};
use comptoir_core::domain::user::{NewUser, User, UserId, UserRole};
use comptoir_core::errors::{ApplicationError, DomainError};

use comptoir_db::repositories::{SqlClientRepository, SqlSupplierRepository, SqlUserRepository};

use crate::respond::{error_response, ApiError, MessageResponse};
use crate::state::ApiState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PartyRequest {
    pub nom: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub adresse: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PartyResponse {
    pub id: i64,
    pub nom: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub adresse: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub nom_utilisateur: String,
    pub nom_complet: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub nom_utilisateur: String,
    pub nom_complet: String,
    pub role: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route("/api/clients/{id}", get(fetch_client).put(update_client).delete(delete_client))
        .route("/api/fournisseurs", get(list_suppliers).post(create_supplier))
        .route(
            "/api/fournisseurs/{id}",
            get(fetch_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route("/api/utilisateurs", get(list_users).post(create_user))
        .route("/api/utilisateurs/{id}", get(fetch_user).put(update_user).delete(delete_user))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Client handlers
// ---------------------------------------------------------------------------

pub async fn create_client(
    State(state): State<ApiState>,
    Json(request): Json<PartyRequest>,
) -> Result<(StatusCode, Json<PartyResponse>), ApiError> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let client = repo.create(&new_client(request)).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(client_response(client))))
}

pub async fn list_clients(
    State(state): State<ApiState>,
) -> Result<Json<Vec<PartyResponse>>, ApiError> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let clients = repo.list().await.map_err(error_response)?;
    Ok(Json(clients.into_iter().map(client_response).collect()))
}

pub async fn fetch_client(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<PartyResponse>, ApiError> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let client = repo
        .find_by_id(ClientId(id))
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(ApplicationError::NotFound(format!("client {id}"))))?;
    Ok(Json(client_response(client)))
}

pub async fn update_client(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(request): Json<PartyRequest>,
) -> Result<Json<PartyResponse>, ApiError> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    let client = repo.update(ClientId(id), &new_client(request)).await.map_err(error_response)?;
    Ok(Json(client_response(client)))
}

pub async fn delete_client(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = SqlClientRepository::new(state.db_pool.clone());
    repo.delete(ClientId(id)).await.map_err(error_response)?;
    Ok(Json(MessageResponse { message: "Client supprimé".to_string() }))
}

// ---------------------------------------------------------------------------
// Supplier handlers
// ---------------------------------------------------------------------------

pub async fn create_supplier(
    State(state): State<ApiState>,
    Json(request): Json<PartyRequest>,
) -> Result<(StatusCode, Json<PartyResponse>), ApiError> {
    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    let supplier = repo.create(&new_supplier(request)).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(supplier_response(supplier))))
}

pub async fn list_suppliers(
    State(state): State<ApiState>,
) -> Result<Json<Vec<PartyResponse>>, ApiError> {
    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    let suppliers = repo.list().await.map_err(error_response)?;
    Ok(Json(suppliers.into_iter().map(supplier_response).collect()))
}

pub async fn fetch_supplier(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<PartyResponse>, ApiError> {
    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    let supplier = repo
        .find_by_id(SupplierId(id))
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(ApplicationError::NotFound(format!("supplier {id}"))))?;
    Ok(Json(supplier_response(supplier)))
}

pub async fn update_supplier(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(request): Json<PartyRequest>,
) -> Result<Json<PartyResponse>, ApiError> {
    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    let supplier =
        repo.update(SupplierId(id), &new_supplier(request)).await.map_err(error_response)?;
    Ok(Json(supplier_response(supplier)))
}

pub async fn delete_supplier(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    repo.delete(SupplierId(id)).await.map_err(error_response)?;
    Ok(Json(MessageResponse { message: "Fournisseur supprimé".to_string() }))
}

// ---------------------------------------------------------------------------
// User handlers
// ---------------------------------------------------------------------------

pub async fn create_user(
    State(state): State<ApiState>,
    Json(request): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let input = new_user(request).map_err(error_response)?;
    let repo = SqlUserRepository::new(state.db_pool.clone());
    let user = repo.create(&input).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(user_response(user))))
}

pub async fn list_users(
    State(state): State<ApiState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let repo = SqlUserRepository::new(state.db_pool.clone());
    let users = repo.list().await.map_err(error_response)?;
    Ok(Json(users.into_iter().map(user_response).collect()))
}

pub async fn fetch_user(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let repo = SqlUserRepository::new(state.db_pool.clone());
    let user = repo
        .find_by_id(UserId(id))
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(ApplicationError::NotFound(format!("user {id}"))))?;
    Ok(Json(user_response(user)))
}

pub async fn update_user(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(request): Json<UserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let input = new_user(request).map_err(error_response)?;
    let repo = SqlUserRepository::new(state.db_pool.clone());
    let user = repo.update(UserId(id), &input).await.map_err(error_response)?;
    Ok(Json(user_response(user)))
}

pub async fn delete_user(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = SqlUserRepository::new(state.db_pool.clone());
    repo.delete(UserId(id)).await.map_err(error_response)?;
    Ok(Json(MessageResponse { message: "Utilisateur supprimé".to_string() }))
}

// ---------------------------------------------------------------------------
// Wire mapping
// ---------------------------------------------------------------------------

fn new_client(request: PartyRequest) -> NewClient {
    NewClient {
        name: request.nom,
        email: request.email,
        phone: request.telephone,
        address: request.adresse,
    }
}

fn new_supplier(request: PartyRequest) -> NewSupplier {
    NewSupplier {
        name: request.nom,
        email: request.email,
        phone: request.telephone,
        address: request.adresse,
    }
}

fn new_user(request: UserRequest) -> Result<NewUser, ApplicationError> {
    let role = UserRole::parse(&request.role).ok_or_else(|| {
        ApplicationError::Domain(DomainError::InvariantViolation(format!(
            "unknown role `{}` (expected admin|staff)",
            request.role
        )))
    })?;
    Ok(NewUser { username: request.nom_utilisateur, display_name: request.nom_complet, role })
}

fn client_response(client: Client) -> PartyResponse {
    PartyResponse {
        id: client.id.0,
        nom: client.name,
        email: client.email,
        telephone: client.phone,
        adresse: client.address,
    }
}

fn supplier_response(supplier: Supplier) -> PartyResponse {
    PartyResponse {
        id: supplier.id.0,
        nom: supplier.name,
        email: supplier.email,
        telephone: supplier.phone,
        adresse: supplier.address,
    }
}

fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.0,
        nom_utilisateur: user.username,
        nom_complet: user.display_name,
        role: user.role.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        Json,
    };

    use comptoir_db::{connect_with_settings, migrations, DbPool};

    use super::{create_client, create_user, delete_client, PartyRequest, UserRequest};
    use crate::state::ApiState;

    #[tokio::test]
    async fn client_create_and_delete_round_trip() {
        let state = setup_state().await;

        let (status, Json(created)) = create_client(
            State(state.clone()),
            Json(PartyRequest {
                nom: "Durand & Fils".to_string(),
                email: None,
                telephone: None,
                adresse: None,
            }),
        )
        .await
        .expect("create client");
        assert_eq!(status, StatusCode::CREATED);

        delete_client(State(state.clone()), Path(created.id)).await.expect("delete client");

        state.db_pool.close().await;
    }

    #[tokio::test]
    async fn user_with_unknown_role_is_a_bad_request() {
        let state = setup_state().await;

        let (status, _) = create_user(
            State(state.clone()),
            Json(UserRequest {
                nom_utilisateur: "jdoe".to_string(),
                nom_complet: "J. Doe".to_string(),
                role: "manager".to_string(),
            }),
        )
        .await
        .expect_err("unknown role");
        assert_eq!(status, StatusCode::BAD_REQUEST);

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
