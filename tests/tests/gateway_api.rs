use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use ragline_gateway::build_router;
use ragline_kernel::rag::ChunkStore;
use ragline_testing::{FakeModelLister, TestApp, pdf_with_pages, ready_chunk};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "ragline-test-boundary";

fn router(app: &TestApp) -> Router {
    build_router(app.state.clone())
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(app).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &TestApp, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &TestApp, path: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn upload(app: &TestApp, filename: &str, contents: &str) -> (StatusCode, Value) {
    upload_bytes(app, filename, "text/plain", contents.as_bytes()).await
}

async fn upload_bytes(
    app: &TestApp,
    filename: &str,
    content_type: &str,
    contents: &[u8],
) -> (StatusCode, Value) {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_is_always_ok() {
    let app = TestApp::new(2).await;

    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn models_are_split_by_purpose() {
    let models = FakeModelLister::with_models(&["qwen3-embedding:4b", "llama3.1:8b"]);
    let app = TestApp::with_models(2, models).await;

    let (status, body) = get_json(&app, "/models").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"].as_array().unwrap().len(), 2);
    assert_eq!(body["embedding_models"][0]["name"], "qwen3-embedding:4b");
    assert_eq!(body["generation_models"][0]["name"], "llama3.1:8b");
}

#[tokio::test]
async fn upload_process_embed_retrieve_reset() {
    let app = TestApp::new(2).await;
    app.chat
        .set_reply("alpha beta ¶ gamma delta", None)
        .await;
    app.reranker_backend.set_score("alpha beta", 0.2).await;
    app.reranker_backend.set_score("gamma delta", 0.8).await;

    let (status, body) = upload(&app, "notes.txt", "alpha beta gamma delta").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["filename"], "notes.txt");

    let (status, body) = post_json(&app, "/embed", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "no_updates_needed", "count": 0 }));

    let (status, body) = post_json(&app, "/process", json!({ "filename": "notes.txt" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["chunks_count"], 2);
    assert_eq!(body["pages_processed"], 1);
    assert!(body["metrics"]["total_time"].is_number());
    assert_eq!(app.store.count().await.unwrap(), 2);

    let (status, body) = post_json(&app, "/embed", json!({ "batch_size": 1 })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 2);
    assert!(body["failed"].as_array().unwrap().is_empty());
    assert_eq!(app.embedder.call_count().await, 2);

    let (status, body) = post_json(
        &app,
        "/retrieve",
        json!({ "query": "gamma", "top_k": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], "gamma delta");
    assert_eq!(results[0]["source"], "notes.txt");
    assert!(body["metrics"]["reranking_time"].is_number());
    assert_eq!(app.reranker_backend.live(), 0);

    let (status, _) = post_json(&app, "/reset", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.count().await.unwrap(), 0);
    let uploads = app.state.workspace.uploads_dir().to_path_buf();
    let mut entries = tokio::fs::read_dir(&uploads).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn processing_a_missing_upload_is_not_found() {
    let app = TestApp::new(2).await;

    let (status, body) = post_json(&app, "/process", json!({ "filename": "ghost.txt" })).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn upload_names_cannot_escape_the_workspace() {
    let app = TestApp::new(2).await;

    let (status, _) = post_json(&app, "/process", json!({ "filename": "../secrets.txt" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_document_format_is_rejected() {
    let app = TestApp::new(2).await;
    let (status, _) = upload(&app, "letter.docx", "PK not a zip").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/process", json!({ "filename": "letter.docx" })).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn pdf_upload_is_chunked_per_page() {
    let app = TestApp::new(2).await;
    let pdf = pdf_with_pages(&["Mitochondria make energy", "Ribosomes build proteins"]);
    let (status, _) = upload_bytes(&app, "cells.pdf", "application/pdf", &pdf).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/process", json!({ "filename": "cells.pdf" })).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["pages_processed"], 2);
    let mut records = app.store.scan_all().await.unwrap();
    records.sort_by_key(|r| r.page);
    let pages: Vec<u32> = records.iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![1, 2]);
    assert!(records.iter().all(|r| r.source == "cells.pdf" && r.is_pending()));
    assert!(records[0].text.contains("Mitochondria"));
    assert!(records[1].text.contains("Ribosomes"));
}

#[tokio::test]
async fn corrupt_pdf_is_a_bad_request() {
    let app = TestApp::new(2).await;
    let (status, _) = upload(&app, "scan.pdf", "%PDF-1.7").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/process", json!({ "filename": "scan.pdf" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn empty_query_is_a_bad_request() {
    let app = TestApp::new(2).await;

    let (status, body) = post_json(&app, "/retrieve", json!({ "query": "   " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn retrieve_on_empty_store_returns_no_results() {
    let app = TestApp::new(2).await;

    let (status, body) = post_json(&app, "/retrieve", json!({ "query": "anything" })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());
    assert_eq!(body["metrics"]["total_time"], 0.0);
    assert_eq!(app.embedder.call_count().await, 0);
}

#[tokio::test]
async fn reranker_failure_reports_its_stage() {
    let app = TestApp::new(2).await;
    app.store
        .insert(vec![ready_chunk("a", "alpha", vec![1.0, 1.0])])
        .await
        .unwrap();
    app.reranker_backend.fail_on("alpha").await;

    let (status, body) = post_json(&app, "/retrieve", json!({ "query": "alpha" })).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "RETRIEVAL_FAILED");
    assert_eq!(body["error"]["stage"], "reranking");
    assert_eq!(app.reranker_backend.live(), 0);
}

#[tokio::test]
async fn zero_top_k_is_a_configuration_error() {
    let app = TestApp::new(2).await;
    app.store
        .insert(vec![ready_chunk("a", "alpha", vec![1.0, 1.0])])
        .await
        .unwrap();

    let (status, body) =
        post_json(&app, "/retrieve", json!({ "query": "alpha", "top_k": 0 })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn generate_returns_answer_and_metrics() {
    let app = TestApp::new(2).await;
    app.chat.set_reply("Paris is the capital.", Some(6)).await;

    let (status, body) = post_json(
        &app,
        "/generate",
        json!({
            "query": "What is the capital of France?",
            "context": "France's capital is Paris.",
            "model": "llama3.1:8b",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["answer"], "Paris is the capital.");
    assert_eq!(body["metrics"]["token_count"], 6);
    let prompt = &app.chat.history().await[0];
    assert!(prompt.iter().any(|m| m.content.contains("France's capital is Paris.")));
}

#[tokio::test]
async fn generate_failure_is_a_bad_gateway() {
    let app = TestApp::new(2).await;
    app.chat.set_failing(true).await;

    let (status, body) = post_json(
        &app,
        "/generate",
        json!({ "query": "q", "context": "c", "model": "m" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "PROVIDER_ERROR");
}

#[tokio::test]
async fn generate_stream_ends_with_a_summary_event() {
    let app = TestApp::new(2).await;
    app.chat.set_deltas(&["Par", "is"]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/generate/stream")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "query": "q", "context": "c", "model": "m" }).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let events: Vec<Value> = String::from_utf8(body)
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["content"], "Par");
    assert_eq!(events[1]["content"], "is");
    let summary = &events[2];
    assert_eq!(summary["done"], true);
    assert!(summary["metrics"]["token_count"].as_u64().unwrap() >= 1);
}
