use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{
    success_response, NextStatusesResponse, PaginatedResponse, PaginationParams,
    StatusChangeRequest,
};
use crate::{
    entities::bdl::{self, BdlStatus},
    errors::ServiceError,
    rules,
    services::bdls::BdlFilter,
    ApiResult, AppState,
};

pub async fn list_bdls(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<BdlFilter>,
) -> ApiResult<PaginatedResponse<bdl::Model>> {
    let page = state
        .services
        .bdls
        .list(filter, pagination.to_request(&state.config))
        .await?;
    Ok(success_response(page.into()))
}

pub async fn get_bdl(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<bdl::Model> {
    Ok(success_response(state.services.bdls.get(id).await?))
}

pub async fn delete_bdl(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.bdls.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bdl_next_statuses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<NextStatusesResponse> {
    let current = state.services.bdls.get(id).await?;
    let invoiceable = rules::is_facture_generable(std::slice::from_ref(&current));
    Ok(success_response(NextStatusesResponse::new(
        current.statut,
        Some(invoiceable),
    )))
}

pub async fn change_bdl_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> ApiResult<bdl::Model> {
    let to = request.target::<BdlStatus>()?;
    Ok(success_response(state.services.bdls.transition(id, to).await?))
}
