use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use filmshelf_api::{
    api::{create_router, AppState},
    references::{StaticCatalog, StaticIdentity},
};

fn create_test_server() -> TestServer {
    let identity = StaticIdentity::new()
        .with_user("U1", "Ada")
        .with_user("U2", "Grace");
    let catalog = StaticCatalog::new()
        .with_film("F1", "The Third Man")
        .with_film("F2", "Double Indemnity")
        .with_film("F3", "Out of the Past");
    let state = AppState::in_memory(Arc::new(identity), Arc::new(catalog));
    TestServer::new(create_router(state)).unwrap()
}

fn as_user(user_id: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static(user_id),
    )
}

async fn create_list(
    server: &TestServer,
    owner: &'static str,
    name: &str,
    visibility: &str,
) -> String {
    let (header, value) = as_user(owner);
    let response = server
        .post("/api/v1/lists")
        .add_header(header, value)
        .json(&json!({
            "name": name,
            "tag": "noir",
            "visibility": visibility
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    created["list_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("gw-1234"),
        )
        .await;

    assert_eq!(response.header("x-request-id"), "gw-1234");
}

#[tokio::test]
async fn test_rate_then_status() {
    let server = create_test_server();

    for (user, rating) in [("U1", 8), ("U2", 6)] {
        let (header, value) = as_user(user);
        server
            .post("/api/v1/interactions/films/F1/rate")
            .add_header(header, value)
            .json(&json!({ "rating": rating }))
            .await
            .assert_status_ok();
    }

    let (header, value) = as_user("U1");
    let response = server
        .get("/api/v1/interactions/films/F1/status")
        .add_header(header, value)
        .await;

    response.assert_status_ok();
    let status: Value = response.json();
    assert_eq!(status["user_rating"], 8);
    assert_eq!(status["average_rating"], 7.0);
    assert_eq!(status["total_ratings"], 2);
    assert_eq!(status["is_favorite"], false);
}

#[tokio::test]
async fn test_out_of_range_rating_is_bad_request() {
    let server = create_test_server();
    let (header, value) = as_user("U1");

    let response = server
        .post("/api/v1/interactions/films/F1/rate")
        .add_header(header, value)
        .json(&json!({ "rating": 11 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_RATING");
}

#[tokio::test]
async fn test_mutations_require_caller() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/interactions/films/F1/favorite")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_unknown_film_is_not_found() {
    let server = create_test_server();

    let response = server.get("/api/v1/interactions/reviews/film/F404").await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "FILM_NOT_FOUND");
}

#[tokio::test]
async fn test_public_favorites_of_user() {
    let server = create_test_server();
    let (header, value) = as_user("U2");
    server
        .post("/api/v1/interactions/films/F3/favorite")
        .add_header(header, value)
        .await
        .assert_status_ok();

    let response = server.get("/api/v1/interactions/public/favorites/U2").await;

    response.assert_status_ok();
    let favorites: Vec<Value> = response.json();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["title"], "Out of the Past");
}

#[tokio::test]
async fn test_noir_classics_scenario() {
    let server = create_test_server();
    let list_id = create_list(&server, "U1", "Noir Classics", "PRIVATE").await;

    for film_id in ["F1", "F2"] {
        let (header, value) = as_user("U1");
        server
            .post(&format!("/api/v1/lists/{}/films", list_id))
            .add_header(header, value)
            .json(&json!({ "film_id": film_id }))
            .await
            .assert_status_ok();
    }

    let (header, value) = as_user("U1");
    let response = server
        .put(&format!("/api/v1/lists/{}", list_id))
        .add_header(header, value)
        .json(&json!({ "tag": "neo-noir" }))
        .await;

    response.assert_status_ok();
    let detail: Value = response.json();
    assert_eq!(detail["name"], "Noir Classics");
    assert_eq!(detail["tag"], "neo-noir");
    assert_eq!(detail["films"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_anonymous_sees_only_public_lists() {
    let server = create_test_server();
    create_list(&server, "U1", "Secret", "PRIVATE").await;
    let public_id = create_list(&server, "U1", "Open", "PUBLIC").await;

    let response = server.get("/api/v1/lists/user/U1").await;

    response.assert_status_ok();
    let lists: Vec<Value> = response.json();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0]["list_id"], public_id.as_str());

    let (header, value) = as_user("U1");
    let own: Vec<Value> = server
        .get("/api/v1/lists/user/U1")
        .add_header(header, value)
        .await
        .json();
    assert_eq!(own.len(), 2);
}

#[tokio::test]
async fn test_private_list_is_forbidden_to_others() {
    let server = create_test_server();
    let list_id = create_list(&server, "U1", "Secret", "PRIVATE").await;

    server
        .get(&format!("/api/v1/lists/{}", list_id))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (header, value) = as_user("U2");
    server
        .get(&format!("/api/v1/lists/{}", list_id))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (header, value) = as_user("U1");
    server
        .get(&format!("/api/v1/lists/{}", list_id))
        .add_header(header, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_add_and_remove_are_idempotent() {
    let server = create_test_server();
    let list_id = create_list(&server, "U1", "Noir", "PUBLIC").await;

    for _ in 0..2 {
        let (header, value) = as_user("U1");
        server
            .post(&format!("/api/v1/lists/{}/films", list_id))
            .add_header(header, value)
            .json(&json!({ "film_id": "F1" }))
            .await
            .assert_status_ok();
    }

    let detail: Value = server.get(&format!("/api/v1/lists/{}", list_id)).await.json();
    assert_eq!(detail["films"].as_array().unwrap().len(), 1);

    for _ in 0..2 {
        let (header, value) = as_user("U1");
        server
            .delete(&format!("/api/v1/lists/{}/films/F1", list_id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    let detail: Value = server.get(&format!("/api/v1/lists/{}", list_id)).await.json();
    assert!(detail["films"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_by_non_owner_is_not_found() {
    let server = create_test_server();
    let list_id = create_list(&server, "U1", "Noir", "PUBLIC").await;

    let (header, value) = as_user("U2");
    let response = server
        .delete(&format!("/api/v1/lists/{}", list_id))
        .add_header(header, value)
        .await;
    response.assert_status_not_found();

    let (header, value) = as_user("U1");
    server
        .delete(&format!("/api/v1/lists/{}", list_id))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/api/v1/lists/{}", list_id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_latest_public_lists_default_limit() {
    let server = create_test_server();
    for name in ["One", "Two", "Three"] {
        create_list(&server, "U1", name, "PUBLIC").await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let lists: Vec<Value> = server.get("/api/v1/lists/public/latest").await.json();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0]["name"], "Three");
    assert_eq!(lists[0]["owner"]["name"], "Ada");

    let lists: Vec<Value> = server
        .get("/api/v1/lists/public/latest")
        .add_query_param("limit", 10)
        .await
        .json();
    assert_eq!(lists.len(), 3);
}
