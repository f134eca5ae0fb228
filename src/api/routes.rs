use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::{interactions, lists, AppState};

/// Creates the application router with all routes
///
/// The request id middleware wraps tracing so every request span carries the id.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/interactions", interaction_routes())
        .nest("/lists", list_routes())
}

fn interaction_routes() -> Router<AppState> {
    Router::new()
        .route("/films/:film_id/rate", post(interactions::rate))
        .route("/films/:film_id/favorite", post(interactions::toggle_favorite))
        .route("/films/:film_id/comment", post(interactions::comment))
        .route("/films/:film_id/status", get(interactions::status))
        .route("/favorites", get(interactions::my_favorites))
        .route("/ratings/latest", get(interactions::my_latest_ratings))
        .route("/reviews/film/:film_id", get(interactions::film_reviews))
        .route("/public/favorites/:user_id", get(interactions::public_favorites))
        .route("/public/ratings/:user_id", get(interactions::public_latest_ratings))
}

fn list_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(lists::create).get(lists::mine))
        .route("/public/latest", get(lists::latest_public))
        .route("/user/:user_id", get(lists::of_user))
        .route(
            "/:list_id",
            get(lists::details).put(lists::update).delete(lists::delete),
        )
        .route("/:list_id/films", post(lists::add_film))
        .route("/:list_id/films/:film_id", axum::routing::delete(lists::remove_film))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
