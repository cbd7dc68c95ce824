mod common;

use axum::{body::Body, http::Request};
use serde_json::json;

#[tokio::test]
async fn health_reports_memory_backend() {
    let (_store, bin) = common::setup();
    let app = common::app(bin);

    let (status, body) = common::send(&app, common::get("/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "memory");
}

#[tokio::test]
async fn capture_list_show_and_restore() {
    let (store, bin) = common::setup();
    let app = common::app(bin);

    let (status, body) = common::send(
        &app,
        common::post_json(
            "/api/recycle",
            json!({
                "table": "resolutions",
                "original_id": 42,
                "record": {"id": 42, "title": "Budget Q1", "amount": 1000},
                "actor": "admin1"
            }),
        ),
    )
    .await;
    assert_eq!(status, 201, "capture failed: {}", body);
    let entry_id = body["data"]["entry_id"].as_i64().unwrap();

    let (status, body) = common::send(&app, common::get("/api/recycle?page=1&page_size=25")).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total_count"], 1);
    assert_eq!(body["data"]["page_size"], 25);
    assert!(body["data"]["error"].is_null());
    assert_eq!(body["data"]["entries"][0]["id"], entry_id);
    assert_eq!(body["data"]["entries"][0]["restorable"], true);

    let (status, body) = common::send(&app, common::get(&format!("/api/recycle/{}", entry_id))).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["original_table"], "resolutions");
    assert_eq!(body["data"]["deleted_by"], "admin1");

    let restore = Request::builder()
        .method("POST")
        .uri(format!("/api/recycle/{}/restore", entry_id))
        .header("x-actor", "admin1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = common::send(&app, restore).await;
    assert_eq!(status, 200, "restore failed: {}", body);
    assert_eq!(body["data"]["restored_id"], 42);
    assert!(store.live_row("resolutions", 42).is_some());

    let again = common::post_json(&format!("/api/recycle/{}/restore", entry_id), json!({}));
    let (status, body) = common::send(&app, again).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "ALREADY_RESTORED");
    assert_eq!(body["message"], "This record has already been restored");
}

#[tokio::test]
async fn restore_collision_is_a_conflict() {
    let (store, bin) = common::setup();
    let entry_id = bin
        .capture("ordinances", Some(3), &common::record(json!({"id": 3, "title": "Noise"})), None)
        .await
        .unwrap();
    store.insert_live_row("ordinances", common::record(json!({"id": 3, "title": "Newer"})));
    let app = common::app(bin);

    let (status, body) = common::send(
        &app,
        common::post_json(&format!("/api/recycle/{}/restore", entry_id), json!({})),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "ID_COLLISION");
    assert_eq!(
        body["message"],
        "Cannot restore because original ID already exists (ordinances #3)"
    );
}

#[tokio::test]
async fn missing_entry_is_not_found() {
    let (_store, bin) = common::setup();
    let app = common::app(bin);

    let (status, body) = common::send(&app, common::get("/api/recycle/12345")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "ENTRY_NOT_FOUND");

    let (status, _) = common::send(
        &app,
        common::post_json("/api/recycle/12345/restore", json!({})),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn capture_rejects_bad_input() {
    let (_store, bin) = common::setup();
    let app = common::app(bin);

    let (status, body) = common::send(
        &app,
        common::post_json("/api/recycle", json!({"table": "users", "record": {"id": 1}})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_TABLE");

    let (status, body) = common::send(
        &app,
        common::post_json("/api/recycle", json!({"table": "minutes", "record": [1, 2]})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn delete_moves_row_into_bin() {
    let (store, bin) = common::setup();
    store.insert_live_row("minutes", common::record(json!({"id": 9, "body": "Roll call"})));
    let app = common::app(bin);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/data/minutes/9")
        .header("x-actor", "clerk")
        .body(Body::empty())
        .unwrap();
    let (status, body) = common::send(&app, request).await;
    assert_eq!(status, 200, "delete failed: {}", body);
    assert_eq!(body["data"]["original_id"], 9);
    assert_eq!(store.row_count("minutes"), 0);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/data/minutes/9")
        .body(Body::empty())
        .unwrap();
    let (status, body) = common::send(&app, request).await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "RECORD_NOT_FOUND");
}

#[tokio::test]
async fn listing_survives_storage_outage() {
    let app = common::app(common::unavailable_bin());

    let (status, body) = common::send(&app, common::get("/api/recycle")).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["entries"], json!([]));
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn malformed_parameters_get_json_errors() {
    let (_store, bin) = common::setup();
    let app = common::app(bin);

    let (status, body) = common::send(&app, common::get("/api/recycle?page=abc")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = common::send(&app, common::get("/api/recycle/not-a-number")).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "BAD_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/api/recycle")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = common::send(&app, request).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "BAD_REQUEST");
}
