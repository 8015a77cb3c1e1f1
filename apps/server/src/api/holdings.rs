use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::{error::ApiResult, main_lib::AppState, models::HoldingsResponse};

/// Latest N-PORT-P holdings for a fund.
async fn get_holdings(
    State(state): State<Arc<AppState>>,
    Path(cik): Path<String>,
) -> ApiResult<Json<HoldingsResponse>> {
    let result = state.holdings_service.resolve_holdings(&cik).await?;
    Ok(Json(HoldingsResponse::from(result.as_ref())))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/holdings/{cik}", get(get_holdings))
}
