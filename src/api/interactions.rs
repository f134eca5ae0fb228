use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::Caller,
    models::{FilmSummary, InteractionView, RatedFilmSummary, ReviewView},
    services::InteractionService,
};

const DEFAULT_LATEST_LIMIT: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    limit: Option<i64>,
}

pub async fn rate(
    State(service): State<Arc<InteractionService>>,
    Caller(user_id): Caller,
    Path(film_id): Path<String>,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<InteractionView>> {
    let view = service
        .rate(&user_id, &film_id, request.rating, request.comment)
        .await?;
    Ok(Json(view))
}

pub async fn toggle_favorite(
    State(service): State<Arc<InteractionService>>,
    Caller(user_id): Caller,
    Path(film_id): Path<String>,
) -> AppResult<Json<InteractionView>> {
    Ok(Json(service.toggle_favorite(&user_id, &film_id).await?))
}

pub async fn comment(
    State(service): State<Arc<InteractionService>>,
    Caller(user_id): Caller,
    Path(film_id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> AppResult<Json<InteractionView>> {
    let view = service
        .add_comment(&user_id, &film_id, request.comment)
        .await?;
    Ok(Json(view))
}

pub async fn status(
    State(service): State<Arc<InteractionService>>,
    Caller(user_id): Caller,
    Path(film_id): Path<String>,
) -> AppResult<Json<InteractionView>> {
    Ok(Json(service.status(&user_id, &film_id).await?))
}

pub async fn my_favorites(
    State(service): State<Arc<InteractionService>>,
    Caller(user_id): Caller,
) -> AppResult<Json<Vec<FilmSummary>>> {
    Ok(Json(service.favorites(&user_id).await?))
}

pub async fn my_latest_ratings(
    State(service): State<Arc<InteractionService>>,
    Caller(user_id): Caller,
    Query(query): Query<LatestQuery>,
) -> AppResult<Json<Vec<RatedFilmSummary>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LATEST_LIMIT);
    Ok(Json(service.latest_rated(&user_id, limit).await?))
}

pub async fn film_reviews(
    State(service): State<Arc<InteractionService>>,
    Path(film_id): Path<String>,
) -> AppResult<Json<Vec<ReviewView>>> {
    Ok(Json(service.film_reviews(&film_id).await?))
}

pub async fn public_favorites(
    State(service): State<Arc<InteractionService>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<FilmSummary>>> {
    Ok(Json(service.favorites(&user_id).await?))
}

pub async fn public_latest_ratings(
    State(service): State<Arc<InteractionService>>,
    Path(user_id): Path<String>,
    Query(query): Query<LatestQuery>,
) -> AppResult<Json<Vec<RatedFilmSummary>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LATEST_LIMIT);
    Ok(Json(service.latest_rated(&user_id, limit).await?))
}
