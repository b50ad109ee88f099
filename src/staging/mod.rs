// src/staging/mod.rs

//! The staging channel: transient HTTP endpoints that hand a tarball from
//! one task to the next within a single plan run.
//!
//! Exactly one producer and one consumer per URL; the file backing exists
//! only so the producer may finish writing before the consumer begins
//! reading. This is a hand-off, not a broker.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scheduler::Interconnect;

struct Inner {
    host: String,
    data_dir: PathBuf,
    endpoints: Mutex<HashMap<String, CancellationToken>>,
    /// Disambiguates endpoints allocated within the same nanosecond.
    seq: AtomicU64,
}

/// Registry of live staging endpoints, shared with the axum handlers.
#[derive(Clone)]
pub struct Transfer {
    inner: Arc<Inner>,
}

impl Transfer {
    /// `host` is the externally reachable base URL (no trailing slash);
    /// `data_dir` must exist and be writable.
    pub fn new(host: String, data_dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                data_dir,
                endpoints: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Routes for mounting into the process-wide router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/transfer/{name}", get(download).post(upload))
            .with_state(self.clone())
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.inner.data_dir.join(name)
    }

    fn lookup(&self, name: &str) -> Option<CancellationToken> {
        self.inner.endpoints.lock().unwrap().get(name).cloned()
    }
}

impl Interconnect for Transfer {
    /// Allocate a fresh endpoint bound to `token` and return its URL.
    ///
    /// When the token fires, the registration and the on-disk file are both
    /// removed.
    fn init_interconnect(&self, token: &CancellationToken) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("{nanos}-{seq}");

        self.inner
            .endpoints
            .lock()
            .unwrap()
            .insert(name.clone(), token.clone());

        let url = format!("{}/v1/transfer/{}", self.inner.host, name);
        info!(url = %url, "staging endpoint opened");

        let transfer = self.clone();
        let cleanup_token = token.clone();
        let cleanup_name = name;
        tokio::spawn(async move {
            cleanup_token.cancelled().await;
            transfer
                .inner
                .endpoints
                .lock()
                .unwrap()
                .remove(&cleanup_name);
            if let Err(e) = tokio::fs::remove_file(transfer.file_path(&cleanup_name)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(name = %cleanup_name, error = %e, "failed to remove staging file");
                }
            }
            info!(name = %cleanup_name, "staging endpoint closed");
        });

        url
    }
}

/// POST: stream the body into the endpoint's file.
async fn upload(
    State(transfer): State<Transfer>,
    Path(name): Path<String>,
    body: Body,
) -> Response {
    if transfer.lookup(&name).is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let mut file = match tokio::fs::File::create(transfer.file_path(&name)).await {
        Ok(file) => file,
        Err(e) => {
            warn!(name = %name, error = %e, "failed to create staging file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(name = %name, error = %e, "failed reading staging upload");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            warn!(name = %name, error = %e, "failed writing staging file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    StatusCode::OK.into_response()
}

/// GET: stream the previously uploaded file back.
async fn download(State(transfer): State<Transfer>, Path(name): Path<String>) -> Response {
    let Some(token) = transfer.lookup(&name) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // The endpoint may have been torn down between registry lookup and the
    // file open; answer promptly rather than serving a half-removed file.
    if token.is_cancelled() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let file = match tokio::fs::File::open(transfer.file_path(&name)).await {
        Ok(file) => file,
        Err(e) => {
            warn!(name = %name, error = %e, "failed to open staging file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Body::from_stream(ReaderStream::new(file)).into_response()
}
