//! Error types for the KUDE server

use std::path::PathBuf;

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::report::RenderError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Request body rejected: {0}")]
    BodyRejected(#[from] BytesRejection),

    #[error("Referenced XML file not found: {}", .0.display())]
    ReferencedFileNotFound(PathBuf),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),

    #[error("No PDF artifact found in {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("IO error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Generation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("No render slot became free in time")]
    Busy,

    #[error("No route for {0}")]
    RouteNotFound(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedInput(_) | Self::EmptyDocument => StatusCode::BAD_REQUEST,
            Self::BodyRejected(rejection) => rejection.status(),
            Self::ReferencedFileNotFound(_) | Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::Render(RenderError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Render(_) | Self::ArtifactNotFound(_) | Self::Filesystem(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Busy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-facing text. Technical detail only goes to the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "Método no permitido",
            Self::MalformedInput(_) | Self::EmptyDocument => "Error al procesar los datos",
            Self::BodyRejected(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "El contenido excede el tamaño permitido"
            }
            Self::BodyRejected(_) => "Error al procesar los datos",
            Self::ReferencedFileNotFound(_) => "Archivo XML no encontrado",
            Self::Render(RenderError::TimedOut(_)) => "Tiempo de espera agotado generando KUDE",
            Self::Render(_) | Self::ArtifactNotFound(_) | Self::Filesystem(_) | Self::Task(_) => {
                "Error generando KUDE"
            }
            Self::Busy => "Servicio ocupado, intente nuevamente",
            Self::RouteNotFound(_) => "Ruta no encontrada",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.public_message();

        match &self {
            AppError::Render(RenderError::Failed { code, stderr }) => {
                tracing::error!(
                    status = status.as_u16(),
                    exit_code = ?code,
                    stderr = %stderr,
                    "{}: {}",
                    message,
                    self
                );
            }
            _ => {
                tracing::error!(status = status.as_u16(), "{}: {}", message, self);
            }
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
