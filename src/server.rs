use crate::error::{ApiError, PermitError, ResolveError};
use crate::models::{AddressQuery, LocationResult, PermitQuery};
use crate::orchestrator::{LOCATION_PATH, PERMIT_PATH};
use crate::permit::PermitQueryStreamer;
use crate::resolver::AddressResolver;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, Method};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Debug, Clone)]
pub struct AppState {
    resolver: Arc<AddressResolver>,
    permits: Arc<PermitQueryStreamer>,
}

impl AppState {
    pub fn new(resolver: AddressResolver, permits: PermitQueryStreamer) -> Self {
        Self {
            resolver: Arc::new(resolver),
            permits: Arc::new(permits),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route(LOCATION_PATH, post(get_location))
        .route(PERMIT_PATH, post(get_permit_info))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> &'static str {
    "OK"
}

// Bodies are parsed by hand so that malformed JSON maps to the route's
// generic 500 rather than the extractor's own rejection.
async fn get_location(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LocationResult>, ApiError> {
    let query: AddressQuery = serde_json::from_slice(&body).map_err(ResolveError::InvalidBody)?;
    let location = state.resolver.resolve(query).await?;
    Ok(Json(location))
}

async fn get_permit_info(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let query: PermitQuery = serde_json::from_slice(&body).map_err(PermitError::InvalidBody)?;
    let relay = state.permits.stream(query).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(relay.into_body_stream()),
    )
        .into_response())
}
