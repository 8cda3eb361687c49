//! Indicator endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, AppState};

use super::{DataResponse, KpiResponse};

/// Publish rate and average member return rate
#[utoipa::path(
    get,
    path = "/kpis",
    tag = "kpis",
    responses(
        (status = 200, description = "Current indicators", body = KpiResponse)
    )
)]
pub async fn get_kpis(State(state): State<AppState>) -> AppResult<Json<KpiResponse>> {
    let kpis = state.services.kpi.compute_kpis().await?;
    Ok(Json(DataResponse::new(kpis)))
}
