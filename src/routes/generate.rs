//! KUDE generation endpoint
//!
//! `POST /` takes either the XML itself or `{"xml": "<path>"}` (depending on
//! `KUDE_REQUEST_MODE`) and answers `{"fileName": "..."}` once the PDF sits
//! in the output folder.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, Uri},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::report::read_document;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub file_name: String,
}

/// Create the generation router
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(generate).fallback(method_not_allowed))
}

/// POST /
async fn generate(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<GenerateResponse>> {
    let body = body?;
    let document = read_document(state.config().request.mode, &body).await?;
    let file_name = state.reports().generate(&document).await?;
    Ok(Json(GenerateResponse { file_name }))
}

async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}

/// Fallback for paths nothing else handles
pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::RouteNotFound(format!("{} {}", method, uri.path()))
}
