//! Web API router construction and shared response utilities.

use axum::{
    Router,
    http::HeaderValue,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{cache_admin, datasets, mutations, status};

/// Cache-Control presets for responses that are not per-dataset.
///
/// Dataset reads carry their own `s-maxage` / `stale-while-revalidate` pair.
pub mod cache {
    /// Cell writes -- never cache.
    pub const MUTATION: &str = "private, no-store";
    /// Cache admin endpoints -- never cache.
    pub const ADMIN: &str = "private, no-store, must-revalidate";
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(header),
    );
    response
}

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let admin_router = Router::new()
        .route(
            "/cache/stats",
            get(cache_admin::cache_stats).delete(cache_admin::invalidate_cache),
        )
        .route(
            "/cache/stats/reset",
            axum::routing::post(cache_admin::reset_stats),
        )
        .layer(axum::middleware::map_response(
            |mut resp: Response| async move {
                resp.headers_mut().insert(
                    axum::http::header::CACHE_CONTROL,
                    HeaderValue::from_static(cache::ADMIN),
                );
                resp
            },
        ));

    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route(
            "/{module}/{resource}",
            get(datasets::read_dataset)
                .put(mutations::update_cell)
                .post(mutations::update_cell),
        )
        .merge(admin_router)
        .method_not_allowed_fallback(method_not_allowed);

    Router::new()
        .nest("/api", api_router)
        .fallback(not_found)
        .with_state(app_state)
        .layer((
            // Outermost: per-request ID span + severity-proportional response logging.
            RequestIdLayer,
            CompressionLayer::new()
                .zstd(true)
                .br(true)
                .gzip(true)
                .quality(tower_http::CompressionLevel::Fastest),
            TimeoutLayer::new(Duration::from_secs(60)),
        ))
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such endpoint")
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("Method not allowed for this endpoint")
}
