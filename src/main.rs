pub mod config;
pub mod maven;
pub mod metadata;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Router, Server};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::maven::Repository;
use crate::metadata::builder::MetadataKind;
use crate::metadata::engine::{sanitize_rel_path, MetadataEngine};
use crate::metadata::error::MetadataError;
use crate::metadata::store::FsMetadataStore;

struct AppState {
    config: Config,
    engine: MetadataEngine,
    shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "arti-shelf.json".to_string());
    let config = Config::load(std::path::Path::new(&config_path))?;

    let addr = SocketAddr::from_str(&config.bind)?;
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState {
        config,
        engine: MetadataEngine::with_lock_wait(Arc::new(FsMetadataStore), Duration::from_secs(10)),
        shutdown: shutdown.clone(),
    });

    let app = Router::new()
        .route(
            "/storages/:storage/:repository/metadata",
            post(rebuild_repository),
        )
        .route(
            "/storages/:storage/:repository/metadata/*path",
            post(rebuild_subtree).delete(remove_version),
        )
        .route("/storages/:storage/:repository/*path", get(get_stored_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("serving {}", addr);
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

fn repository_of(
    state: &AppState,
    storage_id: &str,
    repository_id: &str,
) -> Result<Repository, (StatusCode, String)> {
    state
        .config
        .repository(storage_id, repository_id)
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("unknown repository {}/{}", storage_id, repository_id),
            )
        })
}

fn error_status(error: &MetadataError) -> StatusCode {
    match error {
        MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
        MetadataError::IncompatibleRemoval { .. } => StatusCode::BAD_REQUEST,
        MetadataError::MalformedEntry { .. } => StatusCode::BAD_REQUEST,
        MetadataError::ConcurrencyConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
        MetadataError::StorageFailure { .. } | MetadataError::MalformedDocument { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn rebuild_repository(
    State(state): State<Arc<AppState>>,
    Path((storage_id, repository_id)): Path<(String, String)>,
) -> (StatusCode, String) {
    do_rebuild(&state, &storage_id, &repository_id, None).await
}

async fn rebuild_subtree(
    State(state): State<Arc<AppState>>,
    Path((storage_id, repository_id, base_path)): Path<(String, String, String)>,
) -> (StatusCode, String) {
    do_rebuild(&state, &storage_id, &repository_id, Some(&base_path)).await
}

async fn do_rebuild(
    state: &AppState,
    storage_id: &str,
    repository_id: &str,
    base_path: Option<&str>,
) -> (StatusCode, String) {
    let repository = match repository_of(state, storage_id, repository_id) {
        Ok(repository) => repository,
        Err(response) => return response,
    };

    // per-request child token, so an in-flight rebuild winds down on shutdown
    let cancel = state.shutdown.child_token();
    match state.engine.rebuild(&repository, base_path, &cancel).await {
        Ok(report) if report.is_complete() => (StatusCode::OK, report.to_string()),
        Ok(report) => (StatusCode::INTERNAL_SERVER_ERROR, report.to_string()),
        Err(e) => (error_status(&e), e.to_string()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RemoveLevel {
    ArtifactRoot,
    SnapshotVersion,
}

#[derive(Deserialize)]
struct RemoveParams {
    version: String,
    classifier: Option<String>,
    level: RemoveLevel,
}

async fn remove_version(
    State(state): State<Arc<AppState>>,
    Path((storage_id, repository_id, artifact_path)): Path<(String, String, String)>,
    Query(params): Query<RemoveParams>,
) -> (StatusCode, String) {
    let repository = match repository_of(&state, &storage_id, &repository_id) {
        Ok(repository) => repository,
        Err(response) => return response,
    };

    let level = match params.level {
        RemoveLevel::ArtifactRoot => MetadataKind::ArtifactRoot,
        RemoveLevel::SnapshotVersion => MetadataKind::SnapshotVersion,
    };
    let classifier = params.classifier.as_deref().filter(|c| !c.is_empty());

    match state
        .engine
        .remove_version(&repository, &artifact_path, &params.version, classifier, level)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            format!("removed {} from {}", params.version, artifact_path),
        ),
        Err(e) => (error_status(&e), e.to_string()),
    }
}

async fn get_stored_file(
    State(state): State<Arc<AppState>>,
    Path((storage_id, repository_id, file_path)): Path<(String, String, String)>,
) -> Result<axum::response::Response, (StatusCode, String)> {
    let repository = repository_of(&state, &storage_id, &repository_id)?;

    let rel: PathBuf = sanitize_rel_path(&file_path)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let file = match tokio::fs::File::open(repository.basedir.join(&rel)).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err((StatusCode::NOT_FOUND, format!("no such file: {}", file_path)));
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };

    let body = axum::body::StreamBody::new(ReaderStream::new(file));
    axum::response::Response::builder()
        .body(axum::body::boxed(body))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
