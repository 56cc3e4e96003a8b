use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::common::{
    created_response, success_response, Created, NextStatusesResponse, PaginatedResponse,
    PaginationParams, StatusChangeRequest,
};
use crate::{
    entities::{
        bdc::{self, BdcStatus},
        bdl,
    },
    errors::ServiceError,
    reconciliation::DeliveryProgress,
    services::{
        bdcs::{BdcFilter, CreateBdcRequest},
        bdls::CreateBdlRequest,
    },
    ApiResult, AppState,
};

pub async fn list_bdcs(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<BdcFilter>,
) -> ApiResult<PaginatedResponse<bdc::Model>> {
    let page = state
        .services
        .bdcs
        .list(filter, pagination.to_request(&state.config))
        .await?;
    Ok(success_response(page.into()))
}

pub async fn create_bdc(
    State(state): State<AppState>,
    Json(request): Json<CreateBdcRequest>,
) -> Result<Created<bdc::Model>, ServiceError> {
    Ok(created_response(state.services.bdcs.create(request).await?))
}

pub async fn get_bdc(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<bdc::Model> {
    Ok(success_response(state.services.bdcs.get(id).await?))
}

pub async fn delete_bdc(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.bdcs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bdc_next_statuses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<NextStatusesResponse> {
    let (current, generable) = state.services.bdcs.get_with_bdl_generable(id).await?;
    Ok(success_response(NextStatusesResponse::new(
        current.statut,
        Some(generable),
    )))
}

pub async fn change_bdc_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> ApiResult<bdc::Model> {
    let to = request.target::<BdcStatus>()?;
    Ok(success_response(state.services.bdcs.transition(id, to).await?))
}

pub async fn bdc_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryProgress> {
    Ok(success_response(
        state.services.bdcs.delivery_progress(id).await?,
    ))
}

/// Issues a delivery note against the order.
pub async fn create_bdl_for_bdc(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateBdlRequest>,
) -> Result<Created<bdl::Model>, ServiceError> {
    Ok(created_response(
        state.services.bdls.create(id, request).await?,
    ))
}
