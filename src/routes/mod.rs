use axum::{
    http::{HeaderValue, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    middleware::{make_span_with_request_id, request_id_middleware},
};

pub mod activity;
pub mod movies;
pub mod recommendations;
mod state;
pub mod users;

pub use state::AppState;

/// `?page=` for paged catalog listings
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    /// Requested page, 1 when absent
    pub fn page(&self) -> AppResult<u32> {
        match self.page {
            None => Ok(1),
            Some(0) => Err(AppError::Validation("page must be at least 1".to_string())),
            Some(page) => Ok(page),
        }
    }
}

/// Creates the application router with all routes
///
/// `cors_origin` restricts browser access to one origin; any origin is
/// allowed when it is `None`. Use `Config::cors_allowed_origin` to obtain it.
pub fn create_router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            // Request ids are assigned before the trace span is opened
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(cors),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/movies/search", get(movies::search))
        .route("/movies/popular", get(movies::popular))
        .route("/movies/genres", get(movies::genres))
        .route("/movies/genre/:genre_id", get(movies::by_genre))
        .route("/movies/:movie_id", get(movies::details))
        .route("/movies/:movie_id/similar", get(movies::similar))
        // Users
        .route("/users", post(users::create))
        .route("/users/:user_id", get(users::get))
        .route("/users/:user_id/profile", put(users::update_profile))
        // Activity
        .route(
            "/users/:user_id/watch-history",
            get(activity::watch_history).post(activity::add_to_watch_history),
        )
        .route(
            "/users/:user_id/watch-history/:movie_id",
            delete(activity::remove_from_watch_history),
        )
        .route("/users/:user_id/watch-list", get(activity::watchlist))
        .route(
            "/users/:user_id/watch-list/toggle",
            post(activity::toggle_watchlist),
        )
        .route(
            "/users/:user_id/ratings",
            get(activity::ratings).post(activity::rate_movie),
        )
        .route("/users/:user_id/ratings/:movie_id", get(activity::rating_for))
        // Recommendations
        .route(
            "/users/:user_id/recommendations",
            get(recommendations::for_user),
        )
        .route(
            "/recommendations/similar/:movie_id",
            get(recommendations::similar_by_genre),
        )
        .route(
            "/recommendations/by-genre/:genre_id",
            get(recommendations::by_genre),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
