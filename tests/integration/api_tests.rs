//! HTTP API tests.
//!
//! Drive the router with `tower::ServiceExt::oneshot` against an in-memory
//! file source and a recording submission client.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use omero_converter::server::{create_router, RouterConfig};
use omero_converter::Converter;

use super::test_utils::{
    ome_xml, FailOn, MockFileSource, PageSpec, RecordingClient, TiffBuilder,
};

fn source() -> MockFileSource {
    let stack = TiffBuilder::new()
        .add_pages((0..3).map(|k| PageSpec::ramp8(4, 2, k)))
        .build();
    let ome = TiffBuilder::new()
        .with_description(ome_xml(4, 2, 1, 2, 1))
        .add_pages((0..2).map(|k| PageSpec::ramp8(4, 2, k)))
        .build();
    MockFileSource::new()
        .with_file("/data/stack.tif", stack)
        .with_file("s3://bucket/cells.ome.btf", ome)
}

fn router_with(client: RecordingClient) -> Router {
    create_router(
        Converter::new(source(), client),
        RouterConfig::new().with_tracing(false),
    )
}

fn router() -> Router {
    router_with(RecordingClient::new())
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn convert_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/operations/convert_omero_file")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn file(location: Option<&str>) -> Value {
    json!({
        "id": "file-9",
        "name": "cells.ome.btf",
        "file": location,
        "datasets": [{"id": "ds-1"}]
    })
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_operations_endpoint_lists_convert() {
    let request = Request::builder()
        .uri("/operations")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(router(), request).await;

    assert_eq!(status, StatusCode::OK);
    let operations = json["operations"].as_array().unwrap();
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0]["name"], "convert_omero_file");

    let params = operations[0]["params"].as_array().unwrap();
    let names: Vec<&str> = params.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(
        names[..4],
        ["file", "stage", "era", "dataset"]
    );
    assert_eq!(params[0]["kind"], "structure");
    assert_eq!(params[0]["identifier"], "omero_file");
    assert_eq!(params[0]["nullable"], false);

    let flag = params
        .iter()
        .find(|p| p["name"] == "channels_from_channels")
        .unwrap();
    assert_eq!(flag["kind"], "boolean");
    assert_eq!(flag["default"], true);
}

// =============================================================================
// Conversion
// =============================================================================

#[tokio::test]
async fn test_convert_returns_representation_handles() {
    let body = json!({
        "file": file(Some("s3://bucket/cells.ome.btf")),
        "stage": {"id": "stage-1"},
        "position_tolerance": 1.5
    });
    let (status, json) = send(router(), convert_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    let representations = json["representations"].as_array().unwrap();
    assert_eq!(representations.len(), 1);
    assert_eq!(representations[0]["name"], "cells.ome.btf - Well A1");
    assert!(representations[0]["id"]
        .as_str()
        .unwrap()
        .starts_with("representation-"));
}

#[tokio::test]
async fn test_convert_simple_stack() {
    let body = json!({
        "file": {"id": "file-2", "name": "stack.tif", "file": "/data/stack.tif"},
        "channels_from_channels": false
    });
    let (status, json) = send(router(), convert_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["representations"][0]["id"], "representation-1");
}

#[tokio::test]
async fn test_convert_without_file_is_bad_request() {
    let body = json!({ "file": file(None) });
    let (status, json) = send(router(), convert_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "precondition_failed");
    assert_eq!(json["status"], 400);
    assert!(json["message"].as_str().unwrap().contains("No file provided"));
}

#[tokio::test]
async fn test_convert_unsupported_format() {
    let body = json!({ "file": file(Some("s3://bucket/plate.czi")) });
    let (status, json) = send(router(), convert_request(body)).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["error"], "unsupported_format");
}

#[tokio::test]
async fn test_convert_missing_object_is_not_found() {
    let body = json!({ "file": file(Some("s3://bucket/missing.tif")) });
    let (status, json) = send(router(), convert_request(body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_convert_submission_failure_is_bad_gateway() {
    let body = json!({ "file": file(Some("s3://bucket/cells.ome.btf")) });
    let router = router_with(RecordingClient::failing_on(FailOn::Representation));
    let (status, json) = send(router, convert_request(body)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "submission_error");
}

#[tokio::test]
async fn test_convert_era_without_start_is_bad_request() {
    let body = json!({
        "file": file(Some("s3://bucket/cells.ome.btf")),
        "era": {"id": "era-1"}
    });
    let (status, json) = send(router(), convert_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "precondition_failed");
}

#[tokio::test]
async fn test_convert_rejects_body_without_file() {
    let (status, _) = send(router(), convert_request(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let request = Request::builder()
        .method("POST")
        .uri("/operations/delete_everything")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
