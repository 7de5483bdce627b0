use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::elements::{ElementCache, SourceRegistry};
use crate::predict::{Observer, Predictor};

use super::api::elements as element_handlers;
use super::api::predict as predict_handlers;
use super::api_doc::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub predictor: Predictor,
    pub default_observer: Option<Observer>,
}

impl AppState {
    pub fn from_config(config: Config) -> std::io::Result<Self> {
        let registry = SourceRegistry::from_config(&config.sources()).map_err(std::io::Error::other)?;
        let cache = ElementCache::new(registry, config.cache_settings());
        let predictor = Predictor::new(Arc::new(cache), config.search_settings());
        let default_observer = config.default_observer().map_err(std::io::Error::other)?;

        Ok(Self {
            config: Arc::new(config),
            predictor,
            default_observer,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/predict", get(predict_handlers::list_predictions))
        .route("/api/elements/{norad}", get(element_handlers::get_elements))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let state = AppState::from_config(config)?;
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
