use std::path::{Path, PathBuf};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pagesense_core::outline::{write_json, SERVER_TITLE_CHARS};
use pagesense_core::Outline;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::extract::{document_stem, is_pdf_path, outline_from_bytes, output_path};
use crate::prelude::{eprintln, *};

/// Upper bound on an uploaded document.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, clap::Args, Clone)]
pub struct App {
    /// Host to bind to
    #[arg(long, env = "PAGESENSE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PAGESENSE_PORT", default_value_t = 8000)]
    pub port: u16,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let addr = format!("{}:{}", app.host, app.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    if global.verbose {
        eprintln!("Health endpoint: http://{}/health", addr);
        eprintln!("Upload endpoint: http://{}/extract", addr);
        eprintln!("Path endpoint: http://{}/extract_from_path", addr);
    }
    log::info!("Listening on http://{addr}");

    axum::serve(listener, router())
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/extract", post(extract_upload))
        .route("/extract_from_path", post(extract_from_path))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error rendered as `{"detail": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NoTextBlocks => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotAPdf(_)
            | Error::InvalidContentType(_)
            | Error::MissingField(_)
            | Error::MissingOutputDir => StatusCode::BAD_REQUEST,
            Error::Backend(_) | Error::Io(_) | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            log::error!("Failed to extract outline: {}", self.detail);
        } else {
            log::warn!("Rejected request ({}): {}", self.status, self.detail);
        }
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Default, Deserialize)]
struct ExtractParams {
    #[serde(default)]
    save_json: bool,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PathParams {
    path: Option<PathBuf>,
}

/// An uploaded PDF: its file name stem and bytes.
struct Upload {
    stem: String,
    bytes: Vec<u8>,
}

async fn extract_upload(
    Query(params): Query<ExtractParams>,
    mut multipart: Multipart,
) -> std::result::Result<Json<Outline>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    log::info!("Extracting outline from upload {}", upload.stem);

    let stem = upload.stem.clone();
    let outline = run_pipeline(upload.bytes, stem.clone()).await?;

    if params.save_json {
        let dir = params.output_dir.ok_or(Error::MissingOutputDir)?;
        let written = save_outline(outline.clone(), dir, stem).await?;
        log::info!("Wrote {}", written.display());
    }

    Ok(Json(outline))
}

async fn extract_from_path(
    Query(params): Query<PathParams>,
) -> std::result::Result<Json<Outline>, ApiError> {
    let path = params.path.unwrap_or_default();
    let is_file = tokio::fs::metadata(&path)
        .await
        .is_ok_and(|meta| meta.is_file());
    if !is_file || !is_pdf_path(&path) {
        return Err(Error::NotAPdf(path.display().to_string()).into());
    }
    log::info!("Extracting outline from {}", path.display());

    let bytes = tokio::fs::read(&path).await.map_err(Error::from)?;
    let outline = run_pipeline(bytes, document_stem(&path)).await?;

    Ok(Json(outline))
}

/// Pull the `file` field out of the form, insisting on a PDF content type.
async fn read_upload(multipart: &mut Multipart) -> std::result::Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        detail: format!("Failed to read upload: {e}"),
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if content_type != PDF_CONTENT_TYPE {
            return Err(Error::InvalidContentType(content_type).into());
        }

        let stem = field
            .file_name()
            .map(|name| document_stem(Path::new(name)))
            .unwrap_or_else(|| "upload".to_string());

        let bytes = field.bytes().await.map_err(|e| ApiError {
            status: StatusCode::BAD_REQUEST,
            detail: format!("Failed to read file data: {e}"),
        })?;

        return Ok(Upload {
            stem,
            bytes: bytes.to_vec(),
        });
    }

    Err(Error::MissingField("file".to_string()).into())
}

/// Run the blocking pipeline off the async runtime.
async fn run_pipeline(bytes: Vec<u8>, stem: String) -> std::result::Result<Outline, ApiError> {
    tokio::task::spawn_blocking(move || outline_from_bytes(&bytes, &stem, SERVER_TITLE_CHARS))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

/// Write `<dir>/<stem>.json`, creating `dir` first.
async fn save_outline(
    outline: Outline,
    dir: PathBuf,
    stem: String,
) -> std::result::Result<PathBuf, ApiError> {
    tokio::task::spawn_blocking(move || -> std::result::Result<PathBuf, Error> {
        std::fs::create_dir_all(&dir)?;
        Ok(write_json(&outline, &output_path(&dir, &stem))?)
    })
    .await
    .map_err(|e| ApiError::internal(e.to_string()))?
    .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf::test_support::{sample_pdf, SampleLine};
    use tempfile::TempDir;

    /// Serve the router on an ephemeral port and return its base URL.
    async fn spawn_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn guide_pdf() -> Vec<u8> {
        sample_pdf(&[vec![
            SampleLine::new("User Guide", 24, 720),
            SampleLine::new("install the tool", 10, 680),
            SampleLine::new("run the tool", 10, 666),
            SampleLine::new("enjoy the output", 10, 652),
        ]])
    }

    fn pdf_form(bytes: Vec<u8>, name: &str, mime: &str) -> reqwest::multipart::Form {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(mime)
            .unwrap();
        reqwest::multipart::Form::new().part("file", part)
    }

    async fn detail(response: reqwest::Response) -> String {
        let body: serde_json::Value = response.json().await.unwrap();
        body["detail"].as_str().unwrap().to_string()
    }

    // -----------------------------------------------------------------------
    // Error mapping
    // -----------------------------------------------------------------------

    #[test]
    fn test_error_status_codes() {
        let status = |e: Error| ApiError::from(e).status;

        assert_eq!(status(Error::NoTextBlocks), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(Error::MissingOutputDir), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(Error::InvalidContentType("text/plain".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(Error::NotAPdf("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(Error::Backend(pdf::PdfError::Encrypted)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_detail_text() {
        let err = ApiError::from(Error::NoTextBlocks);
        assert_eq!(err.detail, "No text blocks could be extracted from the PDF");
    }

    // -----------------------------------------------------------------------
    // Endpoints
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health() {
        let base = spawn_server().await;
        let body: serde_json::Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_extract_upload() {
        let base = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/extract"))
            .multipart(pdf_form(guide_pdf(), "guide.pdf", PDF_CONTENT_TYPE))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let outline: Outline = response.json().await.unwrap();
        assert_eq!(outline.title, "User Guide");
        assert_eq!(outline.outline[0].page, 1);
    }

    #[tokio::test]
    async fn test_extract_upload_rejects_content_type() {
        let base = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/extract"))
            .multipart(pdf_form(guide_pdf(), "guide.pdf", "text/plain"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(detail(response).await.contains("must be a PDF"));
    }

    #[tokio::test]
    async fn test_extract_upload_without_text() {
        let base = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/extract"))
            .multipart(pdf_form(sample_pdf(&[vec![]]), "blank.pdf", PDF_CONTENT_TYPE))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            detail(response).await,
            "No text blocks could be extracted from the PDF"
        );
    }

    #[tokio::test]
    async fn test_extract_upload_saves_json() {
        let base = spawn_server().await;
        let out = TempDir::new().unwrap();
        let out_dir = out.path().join("saved");

        let response = reqwest::Client::new()
            .post(format!("{base}/extract"))
            .query(&[
                ("save_json", "true"),
                ("output_dir", out_dir.to_str().unwrap()),
            ])
            .multipart(pdf_form(guide_pdf(), "guide.pdf", PDF_CONTENT_TYPE))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let saved = std::fs::read_to_string(out_dir.join("guide.json")).unwrap();
        let outline: Outline = serde_json::from_str(&saved).unwrap();
        assert_eq!(outline.title, "User Guide");
    }

    #[tokio::test]
    async fn test_extract_upload_save_requires_output_dir() {
        let base = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/extract?save_json=true"))
            .multipart(pdf_form(guide_pdf(), "guide.pdf", PDF_CONTENT_TYPE))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(detail(response).await.contains("output_dir"));
    }

    #[tokio::test]
    async fn test_extract_upload_missing_file_field() {
        let base = spawn_server().await;
        let form = reqwest::multipart::Form::new().text("other", "value");
        let response = reqwest::Client::new()
            .post(format!("{base}/extract"))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_extract_from_path() {
        let base = spawn_server().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Guide.PDF");
        std::fs::write(&path, guide_pdf()).unwrap();

        let response = reqwest::Client::new()
            .post(format!("{base}/extract_from_path"))
            .query(&[("path", path.to_str().unwrap())])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let outline: Outline = response.json().await.unwrap();
        assert_eq!(outline.title, "User Guide");
    }

    #[tokio::test]
    async fn test_extract_from_path_rejects_non_pdf() {
        let base = spawn_server().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let client = reqwest::Client::new();
        for target in [path.to_str().unwrap(), "/nonexistent/file.pdf"] {
            let response = client
                .post(format!("{base}/extract_from_path"))
                .query(&[("path", target)])
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_extract_from_path_rejects_directory() {
        let base = spawn_server().await;
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("scans.pdf");
        std::fs::create_dir(&folder).unwrap();

        let response = reqwest::Client::new()
            .post(format!("{base}/extract_from_path"))
            .query(&[("path", folder.to_str().unwrap())])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        assert!(detail(response).await.contains("not a PDF"));
    }

    #[tokio::test]
    async fn test_extract_from_path_backend_failure() {
        let base = spawn_server().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 truncated").unwrap();

        let response = reqwest::Client::new()
            .post(format!("{base}/extract_from_path"))
            .query(&[("path", path.to_str().unwrap())])
            .send()
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
