//! HTTP transport integration tests.
//!
//! Starts an axum server on port 0 and exercises it with reqwest.

#![cfg(feature = "http")]

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use textcat_registry::{http, InMemoryModelService, ModelService, ServiceConfig};

fn service() -> Arc<InMemoryModelService> {
    Arc::new(ModelService::in_memory(&ServiceConfig {
        poll_interval_ms: 5,
        ..ServiceConfig::default()
    }))
}

/// Bind to port 0 and return the base URL.
async fn start_server(service: Arc<InMemoryModelService>) -> String {
    let app = http::router(service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn model_body(id: &str) -> Value {
    json!({
        "id": id,
        "s3bucket": "albert-textcats",
        "training_object": "trainingSet.json",
    })
}

#[tokio::test]
async fn health_check() {
    let base = start_server(service()).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["queue"], "training");
    assert_eq!(body["labels"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn create_conflict_and_force() {
    let base = start_server(service()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/models"))
        .json(&model_body("tc-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let first: Value = resp.json().await.unwrap();
    assert_eq!(first["status"], "model training started");
    assert!(first["task_id"].as_str().is_some());

    let resp = client
        .post(format!("{base}/models"))
        .json(&model_body("tc-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Cannot update existing model. Use force_update:True"
    );

    let mut forced = model_body("tc-01");
    forced["force_update"] = json!("True");
    let resp = client
        .post(format!("{base}/models"))
        .json(&forced)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let second: Value = resp.json().await.unwrap();
    assert_ne!(second["task_id"], first["task_id"]);
    assert_eq!(second["replaced"]["status"], "started");
}

#[tokio::test]
async fn create_without_required_fields_is_bad_request() {
    let base = start_server(service()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/models"))
        .json(&json!({ "id": "m" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Required parameters not supplied");

    let resp = client
        .post(format!("{base}/models"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut mistyped = model_body("m");
    mistyped["n_texts"] = json!("500");
    let resp = client
        .post(format!("{base}/models"))
        .json(&mistyped)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Wrong parameters");
}

#[tokio::test]
async fn list_get_and_delete() {
    let base = start_server(service()).await;
    let client = reqwest::Client::new();

    let models: Value = reqwest::get(format!("{base}/models"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(models, json!([]));

    client
        .post(format!("{base}/models"))
        .json(&model_body("m1"))
        .send()
        .await
        .unwrap();

    let models: Value = reqwest::get(format!("{base}/models"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(models[0]["id"], "m1");
    assert_eq!(models[0]["status"], "started");
    assert_eq!(models[0]["data"]["n_texts"], 2000);

    let model: Value = reqwest::get(format!("{base}/models/m1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(model["data"]["training_object"], "trainingSet.json");

    let resp = client
        .delete(format!("{base}/models/m1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted: Value = resp.json().await.unwrap();
    assert_eq!(deleted["id"], "m1");

    let resp = client
        .delete(format!("{base}/models/m1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Requested Model ID does not exist");

    let resp = reqwest::get(format!("{base}/models/m1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn prediction_via_post_and_get() {
    let base = start_server(service()).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/models"))
        .json(&model_body("tc-01"))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/prediction"))
        .json(&json!({ "model_id": "tc-01", "text": "overdraft fee", "n_top": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["prediction"].as_array().unwrap().len(), 3);
    assert_eq!(body["prediction_request"]["n_top"], 3);
    assert_eq!(body["model"]["id"], "tc-01");

    // GET with a JSON body, as older clients send it
    let resp = client
        .get(format!("{base}/prediction"))
        .json(&json!({ "model_id": "tc-01", "text": "overdraft fee", "n_top": "2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["prediction"].as_array().unwrap().len(), 2);

    let resp = client
        .post(format!("{base}/prediction"))
        .json(&json!({ "model_id": "tc-01", "text": "overdraft fee", "n_top": 3.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["prediction"].as_array().unwrap().len(), 3);

    let resp = client
        .get(format!("{base}/prediction"))
        .query(&[("model_id", "tc-01"), ("text", "overdraft fee")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["prediction"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn prediction_errors() {
    let base = start_server(service()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/prediction"))
        .json(&json!({ "model_id": "ghost", "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Model ID does not exist");

    let resp = client
        .post(format!("{base}/prediction"))
        .json(&json!({ "model_id": "ghost", "text": "hi", "n_top": "many" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Wrong parameters");

    let resp = client
        .post(format!("{base}/prediction"))
        .json(&json!({ "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Required parameters not supplied");
}

#[tokio::test]
async fn trained_model_reports_active() {
    let service = service();
    let pool = service
        .spawn_workers(
            textcat_registry::ImmediateTrainer,
            service.sender().clone(),
        )
        .unwrap();
    let base = start_server(service).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/models"))
        .json(&model_body("m"))
        .send()
        .await
        .unwrap();

    let mut status = Value::Null;
    for _ in 0..200 {
        let model: Value = reqwest::get(format!("{base}/models/m"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        status = model["status"].clone();
        if status == "active" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, "active");

    let stats = tokio::task::spawn_blocking(move || pool.stop()).await.unwrap();
    assert_eq!(stats.trained, 1);
}
