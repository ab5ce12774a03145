//! Integration tests for the relay's HTTP surface.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` against an
//! in-memory entity store and a live hub task, without binding a TCP port.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hive_api::build_router;
use hive_api::state::AppState;
use hive_db::{EntityStore, MemoryStore};
use hive_relay::{Affinity, Dispatcher, Hub, HubConfig, presence_channel, spawn_presence_writer};
use hive_types::{HiveId, SectorId};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

fn make_test_app() -> TestApp {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (presence_tx, presence_rx) = presence_channel();
    let (hub, _hub_task) = Hub::spawn(HubConfig::default(), presence_tx.clone());
    spawn_presence_writer(Arc::clone(&store), presence_rx);

    let dispatcher = Dispatcher::new(store).with_presence(presence_tx);
    let state = Arc::new(AppState::new(dispatcher, hub));
    TestApp {
        router: build_router(Arc::clone(&state)),
        state,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_hive(app: &TestApp, name: &str) -> String {
    let (status, json) = send(app, post_json("/api/hive", &json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_owned()
}

async fn create_sector(app: &TestApp, hive: &str, name: &str) -> String {
    let (status, json) = send(
        app,
        post_json(
            &format!("/api/hive/{hive}/sector"),
            &json!({ "name": name, "address": "10.0.0.1:27016", "maxPlayers": 32 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_owned()
}

// =========================================================================
// Status
// =========================================================================

#[tokio::test]
async fn test_index_reports_connection_count() {
    let app = make_test_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("connected sectors: 0"));
}

// =========================================================================
// Hives
// =========================================================================

#[tokio::test]
async fn test_create_and_list_hives() {
    let app = make_test_app();
    let id = create_hive(&app, "Andromeda").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/api/hive").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let hives = json.as_array().unwrap();
    assert_eq!(hives.len(), 1);
    assert_eq!(hives[0]["id"], id.as_str());
    assert_eq!(hives[0]["name"], "Andromeda");
}

#[tokio::test]
async fn test_create_hive_rejects_empty_name() {
    let app = make_test_app();
    let (status, json) = send(&app, post_json("/api/hive", &json!({ "name": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_create_hive_rejects_malformed_body() {
    let app = make_test_app();
    let request = Request::post("/api/hive")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

// =========================================================================
// Sectors
// =========================================================================

#[tokio::test]
async fn test_sector_lifecycle() {
    let app = make_test_app();
    let hive = create_hive(&app, "h").await;
    let sector = create_sector(&app, &hive, "Sol").await;

    let (status, json) = send(
        &app,
        Request::get(format!("/api/hive/{hive}/sector"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sectors = json.as_array().unwrap();
    assert_eq!(sectors.len(), 1);
    assert_eq!(sectors[0]["id"], sector.as_str());
    assert_eq!(sectors[0]["state"], "Offline");
    assert_eq!(sectors[0]["max_players"], 32);

    let delete = || {
        Request::delete(format!("/api/hive/{hive}/sector/{sector}"))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, json) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_create_sector_requires_known_hive() {
    let app = make_test_app();
    let (status, _) = send(
        &app,
        post_json(
            &format!("/api/hive/{}/sector", HiveId::new()),
            &json!({ "name": "x", "address": "y" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_hive_id_is_bad_request() {
    let app = make_test_app();
    let (status, json) = send(
        &app,
        Request::get("/api/hive/not-a-uuid/sector")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("not-a-uuid"));
}

// =========================================================================
// Factions
// =========================================================================

#[tokio::test]
async fn test_list_and_purge_factions() {
    let app = make_test_app();
    let hive = create_hive(&app, "h").await;
    let sector = create_sector(&app, &hive, "s").await;

    let origin = Affinity::new(
        HiveId::from(hive.parse::<uuid::Uuid>().unwrap()),
        SectorId::from(sector.parse::<uuid::Uuid>().unwrap()),
    );
    for (local, tag) in [(1, "AAA"), (2, "BBB")] {
        let raw = json!({
            "type": "factionCreated",
            "payload": { "factionId": local, "tag": tag, "name": tag, "founderSteamId": 9 }
        })
        .to_string();
        app.state.dispatcher.dispatch(origin, &raw).await.unwrap();
    }

    let (status, json) = send(
        &app,
        Request::get(format!("/api/hive/{hive}/faction"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = send(
        &app,
        Request::delete(format!("/api/hive/{hive}/faction"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], 2);
}

// =========================================================================
// WebSocket endpoint
// =========================================================================

#[tokio::test]
async fn test_ws_unknown_sector_is_not_found() {
    let app = make_test_app();
    let hive = create_hive(&app, "h").await;

    let (status, _) = send(
        &app,
        Request::get(format!("/ws/hive/{hive}/sector/{}", SectorId::new()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_sector_in_other_hive_is_not_found() {
    let app = make_test_app();
    let hive = create_hive(&app, "a").await;
    let other = create_hive(&app, "b").await;
    let sector = create_sector(&app, &hive, "s").await;

    let (status, _) = send(
        &app,
        Request::get(format!("/ws/hive/{other}/sector/{sector}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_known_sector_requires_upgrade() {
    let app = make_test_app();
    let hive = create_hive(&app, "h").await;
    let sector = create_sector(&app, &hive, "s").await;

    let (status, json) = send(
        &app,
        Request::get(format!("/ws/hive/{hive}/sector/{sector}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}
