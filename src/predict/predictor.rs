use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::elements::{ElementCache, OrbitalElementSet};
use crate::predict::correction::Corrector;
use crate::predict::error::PredictError;
use crate::predict::oracle::Sgp4Oracle;
use crate::predict::pass_finder::{find_passes, SearchSettings};
use crate::predict::sampling::Window;
use crate::predict::types::{PassEvent, PredictionRequest};

/// Result of one prediction request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Prediction {
    pub elements: OrbitalElementSet,
    pub source: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub passes: Vec<PassEvent>,
}

/// Ties the element cache to the pass finder.
#[derive(Clone)]
pub struct Predictor {
    cache: Arc<ElementCache>,
    settings: SearchSettings,
}

impl Predictor {
    pub fn new(cache: Arc<ElementCache>, settings: SearchSettings) -> Self {
        Self { cache, settings }
    }

    pub fn cache(&self) -> &Arc<ElementCache> {
        &self.cache
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, PredictError> {
        self.predict_from(request, Utc::now()).await
    }

    /// Predict passes in `[start, start + request.hours]`.
    pub async fn predict_from(
        &self,
        request: &PredictionRequest,
        start: DateTime<Utc>,
    ) -> Result<Prediction, PredictError> {
        request.validate()?;

        let entry = self.cache.get_entry(request.catalog_id).await?;
        let window = Window::new(start, start + request.look_ahead());

        let elements = entry.elements.clone();
        let observer = request.observer;
        let min_elevation = request.min_elevation_deg;
        let resolution = request.fine_resolution();
        let settings = self.settings;

        // The search is CPU bound; keep it off the async workers.
        let passes = tokio::task::spawn_blocking(move || {
            let oracle = Sgp4Oracle::new(&elements, observer)?;
            let corrector = Corrector::new(observer.altitude_m);
            find_passes(
                &oracle,
                &corrector,
                window,
                min_elevation,
                resolution,
                &settings,
            )
        })
        .await
        .map_err(|e| PredictError::Worker(e.to_string()))??;

        log::info!(
            "{} passes of {} above {} deg in the next {} h",
            passes.len(),
            entry.elements.name,
            min_elevation,
            request.hours
        );

        Ok(Prediction {
            elements: entry.elements,
            source: entry.source,
            window_start: window.start,
            window_end: window.end,
            passes,
        })
    }
}
