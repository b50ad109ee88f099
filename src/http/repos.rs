// src/http/repos.rs

//! `GET /v1/repos`: the SHA tracker's view of every watched (repo, branch).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::metrics::ShaTracker;

#[derive(Serialize)]
struct ReposResponse {
    repos: BTreeMap<String, BTreeMap<String, BranchInfo>>,
}

#[derive(Serialize)]
struct BranchInfo {
    sha: String,
}

pub fn router(tracker: Arc<ShaTracker>) -> Router {
    Router::new()
        .route("/v1/repos", get(list_repos))
        .with_state(tracker)
}

async fn list_repos(State(tracker): State<Arc<ShaTracker>>) -> Json<ReposResponse> {
    let mut repos: BTreeMap<String, BTreeMap<String, BranchInfo>> = BTreeMap::new();

    for info in tracker.repo_info() {
        repos
            .entry(info.repo)
            .or_default()
            .insert(info.branch, BranchInfo { sha: info.sha });
    }

    Json(ReposResponse { repos })
}
