use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, success_response, Created, PaginatedResponse, PaginationParams};
use crate::{
    entities::depense,
    errors::ServiceError,
    services::depenses::{CreateDepenseRequest, DepenseFilter, UpdateDepenseRequest},
    ApiResult, AppState,
};

pub async fn list_depenses(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<DepenseFilter>,
) -> ApiResult<PaginatedResponse<depense::Model>> {
    let page = state
        .services
        .depenses
        .list(filter, pagination.to_request(&state.config))
        .await?;
    Ok(success_response(page.into()))
}

pub async fn create_depense(
    State(state): State<AppState>,
    Json(request): Json<CreateDepenseRequest>,
) -> Result<Created<depense::Model>, ServiceError> {
    Ok(created_response(
        state.services.depenses.create(request).await?,
    ))
}

pub async fn get_depense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<depense::Model> {
    Ok(success_response(state.services.depenses.get(id).await?))
}

pub async fn update_depense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDepenseRequest>,
) -> ApiResult<depense::Model> {
    Ok(success_response(
        state.services.depenses.update(id, request).await?,
    ))
}

pub async fn delete_depense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.depenses.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
