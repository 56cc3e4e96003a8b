use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::common::{created_response, success_response, Created, PaginatedResponse, PaginationParams};
use crate::{
    entities::client,
    errors::ServiceError,
    services::clients::{ClientFilter, CreateClientRequest, UpdateClientRequest},
    ApiResult, AppState,
};

pub async fn list_clients(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ClientFilter>,
) -> ApiResult<PaginatedResponse<client::Model>> {
    let page = state
        .services
        .clients
        .list(filter, pagination.to_request(&state.config))
        .await?;
    Ok(success_response(page.into()))
}

pub async fn create_client(
    State(state): State<AppState>,
    axum::Json(request): axum::Json<CreateClientRequest>,
) -> Result<Created<client::Model>, ServiceError> {
    let created = state.services.clients.create(request).await?;
    Ok(created_response(created))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<client::Model> {
    Ok(success_response(state.services.clients.get(id).await?))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(request): axum::Json<UpdateClientRequest>,
) -> ApiResult<client::Model> {
    Ok(success_response(
        state.services.clients.update(id, request).await?,
    ))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.clients.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Corrective recomputation of the client's rollups.
pub async fn recalculate_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<client::Model> {
    Ok(success_response(
        state.services.clients.recalculate(id).await?,
    ))
}
