mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use codefix::server::router;
use codefix::FALLBACK_RESULT;
use common::{Fixture, ScriptedGenerator};

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let fixture = Fixture::directories_only(ScriptedGenerator::text("ok"));
    let app = router(fixture.codefix.clone());

    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_clone_without_repo_url_is_bad_request() {
    let fixture = Fixture::with_records(ScriptedGenerator::text("ok"));
    let app = router(fixture.codefix.clone());

    let (status, body) = send(&app, "POST", "/api/projects/clone", Some(json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Repository URL and project title are required");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let fixture = Fixture::with_records(ScriptedGenerator::text("ok"));
    let app = router(fixture.codefix.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/api/projects/clone")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unreachable_repository_is_server_error_with_details() {
    let fixture = Fixture::with_records(ScriptedGenerator::text("ok"));
    let app = router(fixture.codefix.clone());
    let missing = fixture.workspace.path().join("nowhere").join("ghost.git");

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects/clone",
        Some(json!({ "repoUrl": missing.to_string_lossy(), "title": "Ghost" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to clone repository");
    assert!(!body["details"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_project_lifecycle_with_memory_records() {
    project_lifecycle(Fixture::with_records(ScriptedGenerator::text("Unclosed call"))).await;
}

#[tokio::test]
async fn test_project_lifecycle_with_sqlite_records() {
    project_lifecycle(Fixture::with_sqlite(ScriptedGenerator::text("Unclosed call"))).await;
}

async fn project_lifecycle(fixture: Fixture) {
    let app = router(fixture.codefix.clone());
    let url = fixture.sample_repo();

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects/clone-repo",
        Some(json!({ "repoUrl": url, "title": "Sample", "tasks": [{ "name": "fix" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Repository cloned and project created successfully");
    assert_eq!(body["project"]["repoName"], "sample-repo");
    assert_eq!(body["project"]["tasks"][0]["name"], "fix");
    let id = body["project"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects/analyze-file",
        Some(json!({ "projectId": id, "filePath": "src/main.js" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fileContent"], "console.log('hi'");
    assert_eq!(body["debuggedResult"], "Unclosed call");

    let (status, body) = send(&app, "GET", "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lastAnalyzedFile"], "src/main.js");
    assert_eq!(body["debuggedResult"], "Unclosed call");

    let (status, body) = send(&app, "DELETE", &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project deleted successfully");

    let (status, _) = send(&app, "DELETE", &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let fixture = Fixture::directories_only(ScriptedGenerator::text("ok"));
    let app = router(fixture.codefix.clone());
    let url = fixture.sample_repo();

    let (status, _) = send(&app, "POST", "/api/projects/clone", Some(json!({ "repoUrl": url }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/projects/analyze-file",
        Some(json!({ "repoName": "sample-repo", "filePath": "missing.js" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/projects/get-file-content",
        Some(json!({ "repoName": "sample-repo", "filePath": "missing.js" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Clone metadata is not part of the file tree
    let (status, _) = send(
        &app,
        "POST",
        "/api/projects/get-file-content",
        Some(json!({ "repoName": "sample-repo", "filePath": ".git/config" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_directory_mode_endpoints() {
    let fixture = Fixture::directories_only(ScriptedGenerator::empty());
    let app = router(fixture.codefix.clone());
    let url = fixture.sample_repo();

    let (status, body) = send(&app, "POST", "/api/projects/clone", Some(json!({ "repoUrl": url }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Repository cloned successfully");
    assert_eq!(body["repoName"], "sample-repo");
    assert_eq!(body["files"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, "GET", "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "projects": ["sample-repo"] }));

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects/get-file-content",
        Some(json!({ "repoName": "sample-repo", "filePath": "README.md" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "# Sample");

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects/analyze-file",
        Some(json!({ "repoName": "sample-repo", "filePath": "README.md" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["debuggedResult"], FALLBACK_RESULT);

    let (status, _) = send(&app, "DELETE", "/api/projects", Some(json!({ "repoName": "sample-repo" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", "/api/projects", Some(json!({ "repoName": "sample-repo" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/projects", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_debug_file_endpoint() {
    let generator = ScriptedGenerator::text("Looks fine");
    let fixture = Fixture::directories_only(generator.clone());
    let app = router(fixture.codefix.clone());

    let (status, body) = send(&app, "POST", "/api/projects/debug-file", Some(json!({ "fileContent": "" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["debuggedResult"], "Looks fine");
    assert!(generator.prompts()[0].ends_with("\n\n"));

    let (status, body) = send(&app, "POST", "/api/projects/debug-file", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File content is required");
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let fixture = Fixture::directories_only(ScriptedGenerator::failing("429 - quota exceeded"));
    let app = router(fixture.codefix.clone());

    let (status, body) = send(&app, "POST", "/api/projects/debug-file", Some(json!({ "fileContent": "x" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to debug file");
    assert!(body["details"].as_str().unwrap().contains("quota exceeded"));
}
