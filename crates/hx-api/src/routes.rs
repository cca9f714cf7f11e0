//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::health::{health, ready};
use crate::handlers::people::{add_photo, complete_photo, create as create_person, delete as delete_person, list as list_people};
use crate::handlers::search::{hybrid, keyword, semantic};
use crate::handlers::upload::{complete as upload_complete, init as upload_init};
use crate::handlers::videos::{get as get_video, list as list_videos, status as video_status};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router (spec §6 route table).
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let video_routes = Router::new()
        .route("/videos/upload/init", post(upload_init))
        .route("/videos/upload/complete", post(upload_complete))
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id/status", get(video_status));

    let search_routes = Router::new()
        .route("/search", get(keyword))
        .route("/search/semantic", get(semantic))
        .route("/search/hybrid", get(hybrid));

    let people_routes = Router::new()
        .route("/people", post(create_person))
        .route("/people", get(list_people))
        .route("/people/:person_id", delete(delete_person))
        .route("/people/:person_id/photos", post(add_photo))
        .route("/people/:person_id/photos/complete", post(complete_photo));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(video_routes)
        .merge(search_routes)
        .merge(people_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
