//! API router construction

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::AppState;
use crate::api::handlers::{self, containers, images, method_not_allowed, status};

/// Build the gateway router.
///
/// Each route answers other methods with 405; unknown paths get 404. Both go
/// through the JSON envelope.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let status_routes = Router::new()
        .route(
            "/docker/status/check",
            get(status::check).fallback(method_not_allowed),
        )
        .route(
            "/docker/status/start",
            get(status::start).fallback(method_not_allowed),
        );

    let image_routes = Router::new()
        .route(
            "/docker/images",
            delete(images::remove_image).fallback(method_not_allowed),
        )
        .route(
            "/docker/images/list",
            get(images::list_images).fallback(method_not_allowed),
        )
        .route(
            "/docker/images/cmd/status",
            get(images::run_command).fallback(method_not_allowed),
        )
        .route(
            "/docker/images/search",
            get(images::search_images).fallback(method_not_allowed),
        )
        .route(
            "/docker/images/pull",
            post(images::pull_image).fallback(method_not_allowed),
        );

    let container_routes = Router::new()
        .route(
            "/docker/container",
            delete(containers::remove_container).fallback(method_not_allowed),
        )
        .route(
            "/docker/container/list",
            get(containers::list_containers).fallback(method_not_allowed),
        )
        .route(
            "/docker/container/run",
            post(containers::run_container).fallback(method_not_allowed),
        )
        .route(
            "/docker/container/run-existing",
            post(containers::run_existing).fallback(method_not_allowed),
        )
        .route(
            "/docker/container/stop",
            post(containers::stop_container).fallback(method_not_allowed),
        );

    Router::new()
        .merge(status_routes)
        .merge(image_routes)
        .merge(container_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
