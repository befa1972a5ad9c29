//! Route modules for KUDE Server

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod generate;
pub mod health;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let body_limit = state.config().request.max_body_bytes;

    Router::new()
        .merge(generate::router())
        .nest("/health", health::router())
        .fallback(generate::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::{Config, RequestMode};
    use crate::report::{RenderError, RenderJob, Renderer};

    /// Stands in for the report tool
    struct FakeRenderer {
        artifact: Option<&'static str>,
        failure: Option<&'static str>,
        calls: AtomicUsize,
        seen_inputs: Mutex<Vec<(PathBuf, String)>>,
    }

    impl FakeRenderer {
        fn producing(artifact: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                artifact,
                failure: None,
                calls: AtomicUsize::new(0),
                seen_inputs: Mutex::new(Vec::new()),
            })
        }

        fn failing(stderr: &'static str) -> Arc<Self> {
            Arc::new(Self {
                artifact: None,
                failure: Some(stderr),
                calls: AtomicUsize::new(0),
                seen_inputs: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, job: &RenderJob) -> Result<String, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = tokio::fs::read_to_string(&job.input).await.unwrap();
            self.seen_inputs
                .lock()
                .unwrap()
                .push((job.input.clone(), content));

            if let Some(stderr) = self.failure {
                return Err(RenderError::Failed {
                    code: Some(1),
                    stderr: stderr.to_string(),
                });
            }
            if let Some(name) = self.artifact {
                tokio::fs::write(job.output_dir.join(name), b"%PDF-1.4").await.unwrap();
            }
            Ok("OK".to_string())
        }
    }

    fn test_config(out: &Path, mode: RequestMode) -> Config {
        let mut config = Config::default();
        config.output.dir = out.to_path_buf();
        config.request.mode = mode;
        config
    }

    fn test_app(out: &Path, mode: RequestMode, renderer: Arc<FakeRenderer>) -> Router {
        app(AppState::new(test_config(out, mode), renderer))
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .body(body.into())
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, serde_json::from_slice(&bytes).unwrap())
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_minimal_document_renders() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(Some("report_final.pdf"));
        let app = test_app(out.path(), RequestMode::RawXml, renderer.clone());

        let (status, content_type, body) = send(app, post("<doc/>")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, json!({ "fileName": "report_final.pdf" }));
        assert_eq!(entries(out.path()), vec!["report_final.pdf".to_string()]);

        let seen = renderer.seen_inputs.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (input, content) = &seen[0];
        assert_eq!(content, "<doc/>");
        let input_name = input.file_name().unwrap().to_string_lossy();
        assert!(input_name.starts_with("temp_") && input_name.ends_with(".xml"));
        assert!(!input.exists());
    }

    #[tokio::test]
    async fn test_file_name_is_sanitized() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(Some("KuDE 001-001-0000123 (Señor).pdf"));
        let app = test_app(out.path(), RequestMode::RawXml, renderer);

        let (status, _, body) = send(app, post("<rDE/>")).await;

        assert_eq!(status, StatusCode::OK);
        let name = body["fileName"].as_str().unwrap();
        assert_eq!(name, "KuDE_001-001-0000123__Se_or_.pdf");
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')));
        assert!(out.path().join(name).exists());
    }

    #[tokio::test]
    async fn test_non_post_is_rejected() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(Some("report.pdf"));

        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let app = test_app(out.path(), RequestMode::RawXml, renderer.clone());
            let request = Request::builder()
                .method(method)
                .uri("/")
                .body(Body::from("<doc/>"))
                .unwrap();

            let (status, _, body) = send(app, request).await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({ "error": "Método no permitido" }));
        }
        assert_eq!(renderer.calls(), 0);
        assert!(entries(out.path()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(Some("report.pdf"));

        for payload in ["", "   \n\t"] {
            let app = test_app(out.path(), RequestMode::RawXml, renderer.clone());
            let (status, _, body) = send(app, post(payload)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "Error al procesar los datos" }));
        }
        assert_eq!(renderer.calls(), 0);
        assert!(entries(out.path()).is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_gets_json_error() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(Some("report.pdf"));
        let mut config = test_config(out.path(), RequestMode::RawXml);
        config.request.max_body_bytes = 16;
        let app = app(AppState::new(config, renderer.clone()));

        let payload = "<rDE><DE Id=\"0123456789\"></DE></rDE>";
        assert!(payload.len() > 16);
        let (status, content_type, body) = send(app, post(payload)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, json!({ "error": "El contenido excede el tamaño permitido" }));
        assert_eq!(renderer.calls(), 0);
        assert!(entries(out.path()).is_empty());
    }

    #[tokio::test]
    async fn test_renderer_failure() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::failing("net.sf.jasperreports.engine.JRException");
        let app = test_app(out.path(), RequestMode::RawXml, renderer.clone());

        let (status, _, body) = send(app, post("<doc/>")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Error generando KUDE" }));
        assert_eq!(renderer.calls(), 1);
        let seen = renderer.seen_inputs.lock().unwrap();
        assert!(!seen[0].0.exists());
        assert!(entries(out.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(None);
        let app = test_app(out.path(), RequestMode::RawXml, renderer.clone());

        let (status, _, body) = send(app, post("<doc/>")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Error generando KUDE" }));
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_pdf_in_output_dir_is_not_picked() {
        let out = TempDir::new().unwrap();
        std::fs::write(out.path().join("someone_else.pdf"), b"%PDF").unwrap();
        let renderer = FakeRenderer::producing(None);
        let app = test_app(out.path(), RequestMode::RawXml, renderer);

        let (status, _, _) = send(app, post("<doc/>")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(entries(out.path()), vec!["someone_else.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_path_reference_mode() {
        let out = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        let xml = src.path().join("factura.xml");
        std::fs::write(&xml, "<rDE><DE Id=\"1\"/></rDE>").unwrap();
        let renderer = FakeRenderer::producing(Some("factura.pdf"));
        let app = test_app(out.path(), RequestMode::PathReference, renderer.clone());

        let payload = serde_json::to_vec(&json!({ "xml": &xml })).unwrap();
        let (status, _, body) = send(app, post(payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "fileName": "factura.pdf" }));
        assert_eq!(renderer.seen_inputs.lock().unwrap()[0].1, "<rDE><DE Id=\"1\"/></rDE>");
        // The referenced source is left alone
        assert!(xml.exists());
    }

    #[tokio::test]
    async fn test_path_reference_errors() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(Some("factura.pdf"));

        let app = test_app(out.path(), RequestMode::PathReference, renderer.clone());
        let payload = serde_json::to_vec(&json!({ "xml": "/definitely/not/here.xml" })).unwrap();
        let (status, _, body) = send(app, post(payload)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Archivo XML no encontrado" }));

        let app = test_app(out.path(), RequestMode::PathReference, renderer.clone());
        let (status, _, body) = send(app, post("{\"xml\":")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Error al procesar los datos" }));

        let app = test_app(out.path(), RequestMode::PathReference, renderer.clone());
        let payload = serde_json::to_vec(&json!({ "xml": "facturas/f1.xml" })).unwrap();
        let (status, _, body) = send(app, post(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Error al procesar los datos" }));

        let app = test_app(out.path(), RequestMode::PathReference, renderer.clone());
        let payload = serde_json::to_vec(&json!({ "xml": out.path() })).unwrap();
        let (status, _, body) = send(app, post(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Error al procesar los datos" }));

        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let out = TempDir::new().unwrap();
        let renderer = FakeRenderer::producing(None);

        let app = test_app(out.path(), RequestMode::RawXml, renderer.clone());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, _, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "kude-server");

        let app = test_app(out.path(), RequestMode::RawXml, renderer);
        let (status, _, body) = send(
            app,
            Request::builder()
                .method("POST")
                .uri("/kude")
                .body(Body::from("<doc/>"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Ruta no encontrada" }));
    }
}
