//! API layer -- axum routes, handlers, and middleware.

mod error;
mod routes;
pub mod state;

pub use self::error::ApiError;
use self::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted upload, in bytes.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with all API routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::root_routes())
        .nest("/api", routes::api_routes())
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback() -> ApiError {
    ApiError::UnknownRoute
}
