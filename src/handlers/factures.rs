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
    entities::facture::{self, FactureStatus},
    errors::ServiceError,
    services::factures::{
        CancelFactureRequest, CreateFactureRequest, EmitFactureRequest, FactureFilter,
    },
    ApiResult, AppState,
};

pub async fn list_factures(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<FactureFilter>,
) -> ApiResult<PaginatedResponse<facture::Model>> {
    let page = state
        .services
        .factures
        .list(filter, pagination.to_request(&state.config))
        .await?;
    Ok(success_response(page.into()))
}

/// Drafts an invoice from delivered notes.
pub async fn create_facture(
    State(state): State<AppState>,
    Json(request): Json<CreateFactureRequest>,
) -> Result<Created<facture::Model>, ServiceError> {
    Ok(created_response(
        state.services.factures.create_from_bdls(request).await?,
    ))
}

pub async fn get_facture(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<facture::Model> {
    Ok(success_response(state.services.factures.get(id).await?))
}

pub async fn delete_facture(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.factures.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn facture_next_statuses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<NextStatusesResponse> {
    let current = state.services.factures.get(id).await?;
    Ok(success_response(NextStatusesResponse::new(current.statut, None)))
}

pub async fn change_facture_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> ApiResult<facture::Model> {
    let to = request.target::<FactureStatus>()?;
    Ok(success_response(
        state
            .services
            .factures
            .transition(id, to, request.motif)
            .await?,
    ))
}

pub async fn emit_facture(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<EmitFactureRequest>>,
) -> ApiResult<facture::Model> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    Ok(success_response(
        state.services.factures.emit(id, request).await?,
    ))
}

pub async fn cancel_facture(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelFactureRequest>,
) -> ApiResult<facture::Model> {
    Ok(success_response(
        state.services.factures.cancel(id, request).await?,
    ))
}
