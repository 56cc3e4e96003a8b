use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use super::common::{created_response, success_response, Created, PaginatedResponse, PaginationParams};
use crate::{
    entities::{facture, paiement},
    errors::ServiceError,
    services::paiements::{PaiementFilter, PaiementReceipt, RecordPaiementRequest},
    ApiResult, AppState,
};

pub async fn list_paiements(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<PaiementFilter>,
) -> ApiResult<PaginatedResponse<paiement::Model>> {
    let page = state
        .services
        .paiements
        .list(filter, pagination.to_request(&state.config))
        .await?;
    Ok(success_response(page.into()))
}

pub async fn record_paiement(
    State(state): State<AppState>,
    Json(request): Json<RecordPaiementRequest>,
) -> Result<Created<PaiementReceipt>, ServiceError> {
    Ok(created_response(
        state.services.paiements.record(request).await?,
    ))
}

pub async fn get_paiement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<paiement::Model> {
    Ok(success_response(state.services.paiements.get(id).await?))
}

/// Administrative removal; returns the re-settled invoice.
pub async fn delete_paiement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<facture::Model> {
    Ok(success_response(state.services.paiements.delete(id).await?))
}
