use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{Caller, Viewer},
    models::{ListDetailView, ListPatch, ListSummary, NewList},
    services::ListService,
};

const DEFAULT_PUBLIC_LIMIT: i64 = 2;

#[derive(Debug, Deserialize)]
pub struct AddFilmRequest {
    pub film_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PublicQuery {
    limit: Option<i64>,
}

pub async fn create(
    State(service): State<Arc<ListService>>,
    Caller(user_id): Caller,
    Json(request): Json<NewList>,
) -> AppResult<(StatusCode, Json<ListDetailView>)> {
    let view = service.create_list(&user_id, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// The caller's own lists, private ones included
pub async fn mine(
    State(service): State<Arc<ListService>>,
    Caller(user_id): Caller,
) -> AppResult<Json<Vec<ListSummary>>> {
    Ok(Json(service.user_lists(&user_id, true).await?))
}

/// Another user's lists; private ones only when the viewer is that user
pub async fn of_user(
    State(service): State<Arc<ListService>>,
    Viewer(viewer): Viewer,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<ListSummary>>> {
    let include_private = viewer.as_deref() == Some(user_id.as_str());
    Ok(Json(service.user_lists(&user_id, include_private).await?))
}

pub async fn details(
    State(service): State<Arc<ListService>>,
    Viewer(viewer): Viewer,
    Path(list_id): Path<String>,
) -> AppResult<Json<ListDetailView>> {
    Ok(Json(service.list_details(&list_id, viewer.as_deref()).await?))
}

pub async fn update(
    State(service): State<Arc<ListService>>,
    Caller(user_id): Caller,
    Path(list_id): Path<String>,
    Json(patch): Json<ListPatch>,
) -> AppResult<Json<ListDetailView>> {
    Ok(Json(service.update_list(&user_id, &list_id, patch).await?))
}

pub async fn delete(
    State(service): State<Arc<ListService>>,
    Caller(user_id): Caller,
    Path(list_id): Path<String>,
) -> AppResult<StatusCode> {
    service.delete_list(&user_id, &list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_film(
    State(service): State<Arc<ListService>>,
    Caller(user_id): Caller,
    Path(list_id): Path<String>,
    Json(request): Json<AddFilmRequest>,
) -> AppResult<Json<ListDetailView>> {
    let view = service
        .add_film_to_list(&user_id, &list_id, &request.film_id)
        .await?;
    Ok(Json(view))
}

pub async fn remove_film(
    State(service): State<Arc<ListService>>,
    Caller(user_id): Caller,
    Path((list_id, film_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    service
        .remove_film_from_list(&user_id, &list_id, &film_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn latest_public(
    State(service): State<Arc<ListService>>,
    Query(query): Query<PublicQuery>,
) -> AppResult<Json<Vec<ListSummary>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PUBLIC_LIMIT);
    Ok(Json(service.latest_public_lists(limit).await?))
}
