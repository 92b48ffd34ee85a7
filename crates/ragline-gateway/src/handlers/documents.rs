//! Document lifecycle endpoints
//!
//! POST /reset   - drop every chunk and every uploaded file
//! POST /upload  - store a multipart `file` field under the uploads directory
//! POST /process - extract, segment and store pending chunks for an upload

use axum::{
    Json,
    extract::{DefaultBodyLimit, Multipart, State},
};
use ragline_foundation::rag::ProcessReport;
use ragline_kernel::RagError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// POST /reset
pub async fn reset(State(state): State<AppState>) -> GatewayResult<Json<Value>> {
    state.workspace.reset(state.store.as_ref()).await?;
    Ok(Json(json!({ "status": "success" })))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub path: String,
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> GatewayResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::InvalidRequest("file field has no file name".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let path = state.workspace.store_upload(&filename, &bytes).await?;
        return Ok(Json(UploadResponse {
            filename,
            path: path.display().to_string(),
        }));
    }

    Err(GatewayError::InvalidRequest(
        "multipart body has no 'file' field".into(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub filename: String,
    /// Defaults to `chunking.default_model`
    pub chunking_model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub report: ProcessReport,
}

/// POST /process
pub async fn process(
    State(state): State<AppState>,
    Json(req): Json<ProcessRequest>,
) -> GatewayResult<Json<ProcessResponse>> {
    let path = state.workspace.upload_path(&req.filename)?;
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(RagError::NotFound(format!("file '{}'", req.filename)).into());
    }

    let model = req
        .chunking_model
        .unwrap_or_else(|| state.config.chunking.default_model.clone());
    let report = state
        .ingestor
        .process(&path, &req.filename, &model)
        .await?;

    Ok(Json(ProcessResponse {
        status: "success",
        report,
    }))
}

pub fn documents_router() -> axum::Router<AppState> {
    use axum::routing::post;
    axum::Router::new()
        .route("/reset", post(reset))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/process", post(process))
}
