use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bookings;
pub mod error;
pub mod form;
pub mod middleware;
pub mod packages;
pub mod response;
pub mod state;

pub use state::AppState;

/// Room for the form fields that ride along with the files
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let media = &state.media;
    let body_limit = (media.limit_for(tourdesk_store::MediaKind::Package) * media.max_package_images())
        .max(media.limit_for(tourdesk_store::MediaKind::Profile))
        + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health))
        .merge(auth::routes(state.clone()))
        .merge(packages::routes(state.clone()))
        .merge(bookings::routes(state.clone()))
        .nest_service("/upload", ServeDir::new(state.media.root()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
