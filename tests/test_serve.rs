//! Integration tests for the HTTP prediction endpoint

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cardiopipe::model::{train_ensemble, ModelFamily, TrainConfig};
use cardiopipe::pipeline::FEATURE_COLUMNS;
use cardiopipe::predictor::Predictor;
use cardiopipe::serve::{build_router, AppState};
use common::{quick_train_config, training_frame};
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn test_app() -> Router {
    let dir = TempDir::new().unwrap();
    let config = TrainConfig {
        families: vec![ModelFamily::NaiveBayes, ModelFamily::LogisticRegression],
        ..quick_train_config(&dir.path().join("smote.csv"), dir.path())
    };
    let outcome = train_ensemble(&training_frame(60), &config).unwrap();
    let predictor = Predictor::from_artifact(outcome.artifact);
    build_router(Arc::new(AppState { predictor }))
}

fn features(high_chol: f64, gen_hlth: f64) -> Map<String, Value> {
    let mut body = Map::new();
    for name in FEATURE_COLUMNS {
        body.insert(name.to_string(), json!(1));
    }
    body.insert("HighChol".to_string(), json!(high_chol));
    body.insert("GenHlth".to_string(), json!(gen_hlth));
    body
}

fn post(body: String) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_predict_returns_probability() {
    let app = test_app();

    let (status, body) = send(app.clone(), post(Value::Object(features(1.0, 4.0)).to_string())).await;
    assert_eq!(status, StatusCode::OK);
    let risky = body["prediction"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&risky));
    assert!(risky > 0.5, "risky {}", risky);

    let (_, body) = send(app, post(Value::Object(features(0.0, 1.0)).to_string())).await;
    let healthy = body["prediction"].as_f64().unwrap();
    assert!(healthy < risky);
}

#[tokio::test]
async fn test_numeric_strings_are_accepted() {
    let mut body = features(1.0, 4.0);
    body.insert("BMI".to_string(), json!("2"));
    let (status, body) = send(test_app(), post(Value::Object(body).to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].is_number());
}

#[tokio::test]
async fn test_missing_fields_are_listed() {
    let mut body = features(1.0, 4.0);
    body.remove("Sex");
    body.remove("BMI");
    let (status, body) = send(test_app(), post(Value::Object(body).to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "missing_fields");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("BMI") && message.contains("Sex"), "{}", message);
}

#[tokio::test]
async fn test_unknown_fields_are_rejected() {
    let mut body = features(1.0, 4.0);
    body.insert("Shoe_Size".to_string(), json!(42));
    let (status, body) = send(test_app(), post(Value::Object(body).to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "unknown_fields");
    assert!(body["error"]["message"].as_str().unwrap().contains("Shoe_Size"));
}

#[tokio::test]
async fn test_non_numeric_value_is_rejected() {
    let mut body = features(1.0, 4.0);
    body.insert("Age_Group".to_string(), json!("old"));
    let (status, body) = send(test_app(), post(Value::Object(body).to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_value");
    assert!(body["error"]["message"].as_str().unwrap().contains("Age_Group"));
}

#[tokio::test]
async fn test_malformed_bodies_are_invalid_requests() {
    let app = test_app();

    let (status, body) = send(app.clone(), post("{ not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request");

    let (status, body) = send(app, post("[1, 2, 3]".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request");
}

#[tokio::test]
async fn test_options_returns_empty_object() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(test_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_cors_preflight_allows_post_with_json() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/predict")
        .header(header::ORIGIN, "http://example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    let value = |name: header::HeaderName| -> String {
        headers
            .get(&name)
            .unwrap_or_else(|| panic!("missing {}", name))
            .to_str()
            .unwrap()
            .to_ascii_lowercase()
    };
    assert_eq!(value(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    let methods = value(header::ACCESS_CONTROL_ALLOW_METHODS);
    assert!(methods.contains("post"), "methods: {}", methods);
    assert!(methods.contains("options"), "methods: {}", methods);
    assert!(value(header::ACCESS_CONTROL_ALLOW_HEADERS).contains("content-type"));
}

#[tokio::test]
async fn test_cors_headers_on_any_origin() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::from(Value::Object(features(1.0, 4.0)).to_string()))
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
