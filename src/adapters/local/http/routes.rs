use super::error::{ApiError, ApiResult};
use crate::application::{DirectArtifact, DownloadRequest, DownloadService, Submission};
use crate::domain::jobs::JobSnapshot;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DownloadService>,
    pub static_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.static_dir.clone();

    Router::new()
        .route("/api/download", post(submit_download))
        .route("/api/conversions", get(list_conversions))
        .route("/api/conversions/:id", get(get_conversion))
        .route("/api/file/:filename", get(serve_file))
        .route("/api/delete/:filename", delete(delete_file))
        .route("/api/retry/:job_id", post(retry_job))
        .route("/api/direct-download/:id", get(direct_download))
        .nest_service("/static", ServeDir::new(&static_dir))
        .fallback_service(ServeDir::new(&static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn submit_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid request body"))?;

    let body = match state.service.submit(request).await? {
        Submission::Converting { job_id } => json!({ "status": "converting", "jobId": job_id }),
        Submission::Processing { job_id } => {
            json!({ "status": "processing", "id": job_id, "jobId": job_id })
        }
        Submission::Ready { download_url } => {
            json!({ "status": "ready", "downloadUrl": download_url })
        }
    };
    Ok(Json(body))
}

async fn list_conversions(State(state): State<AppState>) -> Json<Vec<JobSnapshot>> {
    Json(state.service.list().await)
}

async fn get_conversion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    Ok(Json(state.service.get(&id).await?))
}

async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let path = state
        .service
        .registry()
        .store()
        .resolve_completed(&filename)?;
    attachment(&path, &filename).await
}

async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<Value>> {
    state.service.registry().store().delete(&filename).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.service.retry(&job_id).await?;
    Ok(Json(json!({ "status": "retrying", "jobId": job_id })))
}

async fn direct_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    match state.service.direct_artifact(&id).await? {
        DirectArtifact::Pending => Ok((StatusCode::ACCEPTED, "Download not ready").into_response()),
        DirectArtifact::Ready { filename, path } => {
            let response = attachment(&path, &filename).await?;
            tracing::info!(job = %id, file = %filename, "served direct download");
            Ok(response)
        }
    }
}

/// Streams a file from disk as an attachment download.
async fn attachment(path: &FsPath, filename: &str) -> ApiResult<Response> {
    let file = File::open(path).await.map_err(crate::error::Error::from)?;
    let len = file
        .metadata()
        .await
        .map_err(crate::error::Error::from)?
        .len();

    let disposition = HeaderValue::from_bytes(format!("attachment; filename=\"{}\"", filename).as_bytes())
        .map_err(|e| ApiError::internal(format!("Invalid header value: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
