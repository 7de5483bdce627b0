use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::predict::{PredictQuery, PredictResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::predict::list_predictions,
        super::api::elements::get_elements,
    ),
    components(
        schemas(
            PredictResponse,
            PredictQuery,
            ErrorResponse,
            crate::predict::PassEvent,
            crate::elements::CacheEntry,
            crate::elements::OrbitalElementSet,
            crate::elements::IdentifierMismatch,
        )
    ),
    info(
        title = "Skypass API",
        description = "Visibility windows of orbiting objects over a ground observer",
        version = "0.1.0"
    ),
    tags(
        (name = "predict", description = "Pass prediction"),
        (name = "elements", description = "Cached orbital elements")
    )
)]
pub struct ApiDoc;
