use axum::extract::State;

use super::common::success_response;
use crate::{services::dashboard::Dashboard, ApiResult, AppState};

pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    Ok(success_response(state.services.dashboard.summary().await?))
}
