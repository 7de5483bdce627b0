use axum::{
    extract::{Path, State},
    Json,
};

use crate::elements::CacheEntry;
use crate::predict::PredictError;
use crate::web::api::error::ApiResult;
use crate::web::server::AppState;

#[utoipa::path(
    get,
    path = "/api/elements/{norad}",
    tag = "elements",
    params(("norad" = u32, Path, description = "NORAD catalog number")),
    responses(
        (status = 200, description = "Cached element set and fetch metadata", body = CacheEntry),
        (status = 400, description = "Invalid catalog number", body = super::error::ErrorResponse),
        (status = 503, description = "No element source answered", body = super::error::ErrorResponse)
    )
)]
pub async fn get_elements(
    State(state): State<AppState>,
    Path(norad): Path<u32>,
) -> ApiResult<Json<CacheEntry>> {
    let entry = state
        .predictor
        .cache()
        .get_entry(norad)
        .await
        .map_err(PredictError::from)?;
    Ok(Json(entry))
}
