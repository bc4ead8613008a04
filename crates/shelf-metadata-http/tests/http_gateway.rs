// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HTTP gateway against an in-process axum fake of the metadata API.

#![allow(clippy::unwrap_used)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shelf_metadata::{
    ApiEnvelope, CreateMetadata, GatewayError, MetadataGateway, MetadataRecord, MetadataStore,
    UpdateMetadata, WriteOutcome,
};
use shelf_metadata_http::{HttpConfig, HttpMetadataGateway};
use shelf_prefs::{DefaultSortService, SettingsService, SortPreference, UiSettings};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct FakeApi {
    records: Arc<Mutex<HashMap<String, MetadataRecord>>>,
    next_id: Arc<Mutex<u64>>,
}

type Reply = (StatusCode, Json<ApiEnvelope<MetadataRecord>>);

fn not_found() -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(ApiEnvelope::error(404, "metadata not found")),
    )
}

async fn fetch(State(api): State<FakeApi>, Path(key): Path<String>) -> Reply {
    let found = api.records.lock().unwrap().get(&key).cloned();
    match found {
        Some(rec) => (StatusCode::OK, Json(ApiEnvelope::ok(rec))),
        None => not_found(),
    }
}

async fn create(State(api): State<FakeApi>, Json(body): Json<CreateMetadata>) -> Reply {
    let mut records = api.records.lock().unwrap();
    if records.contains_key(&body.key) {
        return (
            StatusCode::CONFLICT,
            Json(ApiEnvelope::error(409, "key already exists")),
        );
    }
    let id = {
        let mut next = api.next_id.lock().unwrap();
        *next += 1;
        *next
    };
    let now = chrono::Utc::now();
    let rec = MetadataRecord {
        id,
        key: body.key.clone(),
        value: body.value,
        created_at: now,
        updated_at: now,
    };
    records.insert(body.key, rec.clone());
    (StatusCode::CREATED, Json(ApiEnvelope::ok(rec)))
}

async fn update(
    State(api): State<FakeApi>,
    Path(key): Path<String>,
    Json(body): Json<UpdateMetadata>,
) -> Reply {
    let mut records = api.records.lock().unwrap();
    match records.get_mut(&key) {
        Some(rec) => {
            rec.value = body.value;
            rec.updated_at = chrono::Utc::now();
            (StatusCode::OK, Json(ApiEnvelope::ok(rec.clone())))
        }
        None => not_found(),
    }
}

async fn remove(State(api): State<FakeApi>, Path(key): Path<String>) -> Response {
    let removed = api.records.lock().unwrap().remove(&key);
    match removed {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found().into_response(),
    }
}

async fn quirky_fetch() -> Reply {
    // 200 with the not-found reported inside the envelope.
    (StatusCode::OK, Json(ApiEnvelope::error(404, "missing")))
}

async fn broken_fetch() -> Response {
    (StatusCode::OK, "<html>maintenance</html>").into_response()
}

async fn down_fetch() -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

async fn spawn_api() -> (SocketAddr, FakeApi) {
    let api = FakeApi::default();
    let app = Router::new()
        .route("/api/metadata", post(create))
        .route(
            "/api/metadata/{key}",
            get(fetch).put(update).delete(remove),
        )
        .route("/quirky/metadata/{key}", get(quirky_fetch))
        .route("/broken/metadata/{key}", get(broken_fetch))
        .route("/down/metadata/{key}", get(down_fetch))
        .with_state(api.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, api)
}

fn gateway(addr: SocketAddr, root: &str) -> HttpMetadataGateway {
    let config = HttpConfig::new(&format!("http://{addr}/{root}"))
        .unwrap()
        .with_timeout(Duration::from_secs(5));
    HttpMetadataGateway::new(config).unwrap()
}

#[tokio::test]
async fn create_fetch_update_delete_round_trip() {
    let (addr, api) = spawn_api().await;
    let gw = gateway(addr, "api");

    let created = gw.create("ui_settings", "{}").await.unwrap();
    assert_eq!(created.key, "ui_settings");

    let fetched = gw.fetch("ui_settings").await.unwrap();
    assert_eq!(fetched.id, created.id);

    let updated = gw.update("ui_settings", r#"{"darkMode":true}"#).await.unwrap();
    assert_eq!(updated.value, r#"{"darkMode":true}"#);
    assert_eq!(updated.id, created.id);

    gw.delete("ui_settings").await.unwrap();
    assert!(api.records.lock().unwrap().is_empty());
    assert!(gw.fetch("ui_settings").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn duplicate_create_is_a_conflict() {
    let (addr, _api) = spawn_api().await;
    let gw = gateway(addr, "api");
    gw.create("k", "1").await.unwrap();
    assert!(matches!(
        gw.create("k", "2").await,
        Err(GatewayError::Conflict { .. })
    ));
}

#[tokio::test]
async fn missing_key_is_not_found_for_update_and_delete() {
    let (addr, _api) = spawn_api().await;
    let gw = gateway(addr, "api");
    assert!(gw.update("nope", "1").await.unwrap_err().is_not_found());
    assert!(gw.delete("nope").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn odd_keys_survive_the_path() {
    let (addr, api) = spawn_api().await;
    let gw = gateway(addr, "api");
    gw.create("custom fields/videoGame", "[]").await.unwrap();
    assert!(api
        .records
        .lock()
        .unwrap()
        .contains_key("custom fields/videoGame"));
    assert_eq!(
        gw.fetch("custom fields/videoGame").await.unwrap().value,
        "[]"
    );
}

#[tokio::test]
async fn envelope_not_found_on_ok_status_is_not_found() {
    let (addr, _api) = spawn_api().await;
    let gw = gateway(addr, "quirky");
    assert!(gw.fetch("anything").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let (addr, _api) = spawn_api().await;
    let gw = gateway(addr, "broken");
    assert!(matches!(
        gw.fetch("anything").await,
        Err(GatewayError::Decode(_))
    ));
}

#[tokio::test]
async fn server_error_is_a_status_error() {
    let (addr, _api) = spawn_api().await;
    let gw = gateway(addr, "down");
    assert!(matches!(
        gw.fetch("anything").await,
        Err(GatewayError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gw = gateway(addr, "api");
    let err = gw.fetch("k").await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)), "{err:?}");

    // The store's façade turns it into "nothing there".
    let store = MetadataStore::new(gw);
    assert_eq!(store.get::<UiSettings>("k").await, None);
}

#[tokio::test]
async fn store_creates_once_then_updates_over_http() {
    let (addr, api) = spawn_api().await;
    let store = MetadataStore::new(gateway(addr, "api"));

    assert_eq!(
        store.write("count", &1).await.unwrap(),
        WriteOutcome::Created
    );
    assert_eq!(
        store.write("count", &2).await.unwrap(),
        WriteOutcome::Updated
    );
    assert_eq!(store.get::<i32>("count").await, Some(2));
    assert_eq!(api.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn preference_services_work_end_to_end() {
    let (addr, api) = spawn_api().await;
    let store = MetadataStore::new(gateway(addr, "api"));

    let settings = SettingsService::new(store.clone());
    assert_eq!(settings.load_settings().await, UiSettings::default());
    assert!(settings.update_dark_mode(true).await);

    let sorts = DefaultSortService::load(store.clone()).await;
    assert!(sorts.set_default_sort("videoGame", "title", "asc").await);

    // A fresh pair of services sees what the first pair wrote.
    let settings = SettingsService::new(store.clone());
    assert!(settings.load_settings().await.dark_mode);
    let sorts = DefaultSortService::load(store).await;
    assert_eq!(
        sorts.default_sort("videoGame"),
        Some(SortPreference::new("title", "asc"))
    );

    let records = api.records.lock().unwrap();
    assert!(records.contains_key("ui_settings"));
    assert!(records.contains_key("default-sort-filters"));
}
