// src/lib.rs

pub mod config;
pub mod errors;
pub mod git;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod platform;
pub mod scheduler;
pub mod staging;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::git::{RepoRegistry, SystemGitExecutor};
use crate::metrics::{Metrics, ShaTracker};
use crate::pipeline::Pipeline;
use crate::platform::{PlatformClient, UaaTokenFetcher};
use crate::scheduler::{BranchManager, BranchScheduler, ParameterStore};
use crate::staging::Transfer;
use crate::watch::branch::BRANCH_POLL_INTERVAL;
use crate::watch::commit::COMMIT_POLL_INTERVAL;
use crate::watch::{spawn_branch_watcher, BranchHook};

/// Fetch interval for the configuration repository's clone.
const CONFIG_FETCH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Poll interval for the plan file on each tracked branch.
const CONFIG_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// High-level entry point used by `main.rs`.
///
/// Wires together the repo registry, the platform client, the staging
/// channel, the branch watcher/scheduler, and the HTTP server, then runs
/// until Ctrl-C or an invalid plan configuration aborts the engine.
pub async fn run(cfg: Config) -> Result<()> {
    let root = CancellationToken::new();
    let metrics = Arc::new(Metrics::new());
    let tracker = Arc::new(ShaTracker::new());

    let scratch = tempfile::tempdir().context("failed to create scratch dir")?;
    info!(dir = %scratch.path().display(), "scratch dir created");

    let data_dir = scratch.path().join("transfer");
    std::fs::create_dir_all(&data_dir).context("failed to create staging data dir")?;

    let registry = Arc::new(RepoRegistry::new(
        scratch.path().to_path_buf(),
        Arc::new(SystemGitExecutor::new()),
        Arc::clone(&metrics),
        root.clone(),
    ));

    let config_repo = registry
        .fetch_repo_with_interval(&cfg.repo_url, CONFIG_FETCH_INTERVAL)
        .await
        .with_context(|| format!("failed to get config repo {}", cfg.repo_url))?;

    let token_http = reqwest::Client::builder()
        .danger_accept_invalid_certs(cfg.skip_tls_validation)
        .build()
        .context("failed to build token HTTP client")?;
    let tokens = Arc::new(UaaTokenFetcher::new(
        cfg.uaa_addr.clone(),
        cfg.client_id.clone(),
        cfg.refresh_token.clone(),
        token_http,
    ));
    let platform = Arc::new(
        PlatformClient::new(cfg.api_addr.clone(), tokens, cfg.skip_tls_validation)
            .context("failed to build platform client")?,
    );

    let transfer = Transfer::new(cfg.transfer_addr.clone(), data_dir);

    // Parameters come from the process environment, matching how the
    // platform injects them.
    let params: ParameterStore = Arc::new(|key: &str| std::env::var(key).ok());

    let config_failure = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let pipeline = Arc::new(Pipeline {
        app_guid: cfg.app_guid.clone(),
        config_repo_url: cfg.repo_url.clone(),
        plan_path: cfg.plan_path.clone(),
        config_repo: config_repo.clone(),
        registry,
        tasks: platform,
        params,
        tracker: Arc::clone(&tracker),
        staging: Arc::new(transfer.clone()),
        metrics: Arc::clone(&metrics),
        root: root.clone(),
        config_failure: Arc::clone(&config_failure),
        commit_poll_interval: COMMIT_POLL_INTERVAL,
        config_poll_interval: CONFIG_POLL_INTERVAL,
    });

    let on_start_pipeline = Arc::clone(&pipeline);
    let branch_manager = Arc::new(BranchManager::new(
        root.clone(),
        Arc::new(move |token, branch| on_start_pipeline.start_branch(token, branch)),
    ));
    let branch_scheduler = Arc::new(BranchScheduler::new(branch_manager));

    let branch_hook: BranchHook = {
        let branch_scheduler = Arc::clone(&branch_scheduler);
        Arc::new(move |branches| branch_scheduler.set_branches(branches))
    };
    spawn_branch_watcher(
        root.clone(),
        config_repo,
        BRANCH_POLL_INTERVAL,
        Arc::clone(&metrics),
        branch_hook,
    );

    // Ctrl-C → graceful shutdown of the whole token tree.
    {
        let root = root.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            root.cancel();
        });
    }

    let router = http::build_router(&transfer, tracker);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .with_context(|| format!("failed to bind port {}", cfg.port))?;
    info!(port = cfg.port, "HTTP server listening");

    let shutdown = root.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    // The root token only fires on Ctrl-C or on an invalid plan
    // configuration; the latter is a startup-class failure.
    if config_failure.load(std::sync::atomic::Ordering::SeqCst) {
        anyhow::bail!("invalid plan configuration; see log for the offending plan");
    }

    info!("shutting down");
    Ok(())
}
