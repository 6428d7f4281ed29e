use crate::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.config().server.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(handlers::health))

        // Upload form and its action
        .route("/", get(handlers::index).post(handlers::summarize))
        .route("/summarize", post(handlers::summarize))

        // Add state
        .with_state(state)

        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(tower_http::cors::Any)
                        .allow_methods(tower_http::cors::Any)
                        .allow_headers(tower_http::cors::Any),
                )
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
