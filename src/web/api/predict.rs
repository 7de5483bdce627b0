use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::predict::{Observer, PassEvent, PredictError, PredictionRequest};
use crate::web::api::error::ApiResult;
use crate::web::server::AppState;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PredictQuery {
    /// NORAD catalog number
    pub norad: u32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    /// Look-ahead in hours, 1 to 168
    pub hours: Option<u32>,
    pub min_elevation: Option<f64>,
    /// Fine sampling step in minutes, up to 5
    pub resolution: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PredictResponse {
    pub satellite: String,
    pub norad_id: u32,
    pub source: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub passes: Vec<PassEvent>,
}

#[utoipa::path(
    get,
    path = "/api/predict",
    tag = "predict",
    params(PredictQuery),
    responses(
        (status = 200, description = "Pass predictions", body = PredictResponse),
        (status = 400, description = "Invalid parameters", body = super::error::ErrorResponse),
        (status = 503, description = "No element source answered", body = super::error::ErrorResponse)
    )
)]
pub async fn list_predictions(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = build_request(&state, &query)?;
    let prediction = state.predictor.predict(&request).await?;

    Ok((
        StatusCode::OK,
        Json(PredictResponse {
            satellite: prediction.elements.name,
            norad_id: prediction.elements.catalog_id,
            source: prediction.source,
            window_start: prediction.window_start,
            window_end: prediction.window_end,
            passes: prediction.passes,
        }),
    ))
}

fn build_request(state: &AppState, query: &PredictQuery) -> Result<PredictionRequest, PredictError> {
    let observer = match (query.lat, query.lon, state.default_observer) {
        (Some(lat), Some(lon), _) => Observer::new(lat, lon, query.alt.unwrap_or(0.0))?,
        (None, None, Some(default)) => match query.alt {
            Some(alt) => Observer::new(default.latitude_deg, default.longitude_deg, alt)?,
            None => default,
        },
        _ => {
            return Err(PredictError::invalid(
                "observer",
                "lat and lon are required when no default observer is configured",
            ))
        }
    };

    let search = &state.config.search;
    Ok(PredictionRequest {
        observer,
        catalog_id: query.norad,
        hours: query.hours.unwrap_or(search.default_hours),
        min_elevation_deg: query.min_elevation.unwrap_or(search.default_min_elevation),
        fine_resolution_minutes: Some(query.resolution.unwrap_or(search.fine_resolution_minutes)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn query(lat: Option<f64>, lon: Option<f64>) -> PredictQuery {
        PredictQuery {
            norad: 25544,
            lat,
            lon,
            alt: None,
            hours: None,
            min_elevation: None,
            resolution: None,
        }
    }

    #[test]
    fn falls_back_to_configured_observer_and_defaults() {
        let config = Config::from_yaml("observer:\n  coordinates: \"28.6139, 77.2090\"\n").unwrap();
        let state = AppState::from_config(config).unwrap();

        let request = build_request(&state, &query(None, None)).unwrap();
        assert_eq!(request.observer.latitude_deg, 28.6139);
        assert_eq!(request.hours, 24);
        assert_eq!(request.min_elevation_deg, 10.0);
        assert_eq!(request.fine_resolution_minutes, Some(1.0));

        let explicit = build_request(&state, &query(Some(-33.9), Some(18.4))).unwrap();
        assert_eq!(explicit.observer.longitude_deg, 18.4);
    }

    #[test]
    fn requires_coordinates_without_default() {
        let state = AppState::from_config(Config::default()).unwrap();
        assert!(matches!(
            build_request(&state, &query(Some(10.0), None)),
            Err(PredictError::InvalidInput { field: "observer", .. })
        ));
        assert!(matches!(
            build_request(&state, &query(Some(95.0), Some(0.0))),
            Err(PredictError::InvalidInput { field: "latitude", .. })
        ));
    }
}
