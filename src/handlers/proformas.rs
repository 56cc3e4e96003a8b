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
    entities::{bdc, proforma::{self, ProformaStatus}},
    errors::ServiceError,
    rules,
    services::proformas::{CreateProformaRequest, ProformaFilter, UpdateProformaRequest},
    ApiResult, AppState,
};

pub async fn list_proformas(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ProformaFilter>,
) -> ApiResult<PaginatedResponse<proforma::Model>> {
    let page = state
        .services
        .proformas
        .list(filter, pagination.to_request(&state.config))
        .await?;
    Ok(success_response(page.into()))
}

pub async fn create_proforma(
    State(state): State<AppState>,
    Json(request): Json<CreateProformaRequest>,
) -> Result<Created<proforma::Model>, ServiceError> {
    Ok(created_response(
        state.services.proformas.create(request).await?,
    ))
}

pub async fn get_proforma(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<proforma::Model> {
    Ok(success_response(state.services.proformas.get(id).await?))
}

pub async fn update_proforma(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProformaRequest>,
) -> ApiResult<proforma::Model> {
    Ok(success_response(
        state.services.proformas.update(id, request).await?,
    ))
}

pub async fn delete_proforma(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.proformas.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn proforma_next_statuses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<NextStatusesResponse> {
    let current = state.services.proformas.get(id).await?;
    Ok(success_response(NextStatusesResponse::new(
        current.statut,
        Some(rules::is_bdc_generable(&current)),
    )))
}

pub async fn change_proforma_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> ApiResult<proforma::Model> {
    let to = request.target::<ProformaStatus>()?;
    Ok(success_response(
        state.services.proformas.transition(id, to).await?,
    ))
}

pub async fn generate_bdc(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Created<bdc::Model>, ServiceError> {
    Ok(created_response(
        state.services.proformas.generate_bdc(id).await?,
    ))
}
