// src/config/env.rs

//! Process configuration, read once from the environment at startup.

use crate::errors::{PlanwatchError, Result};

/// Everything the engine needs to start. Missing required variables are a
/// fatal startup error.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port for the staging channel and introspection endpoints.
    pub port: u16,

    /// URL of the configuration repository.
    pub repo_url: String,

    /// Path of the plan YAML inside the configuration repository.
    pub plan_path: String,

    /// Platform API root URL.
    pub api_addr: String,

    /// Token endpoint root. Defaults to `api_addr` with the first `api`
    /// replaced by `uaa`.
    pub uaa_addr: String,

    pub client_id: String,
    pub refresh_token: String,
    pub skip_tls_validation: bool,

    /// Platform application identifier tasks are created under.
    pub app_guid: String,

    /// Externally reachable base URL of the staging channel.
    pub transfer_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|_| PlanwatchError::Config(format!("invalid PORT: {v}")))?,
            Err(_) => 8080,
        };

        let api_addr = required("API_ADDR")?;
        let uaa_addr = match std::env::var("UAA_ADDR") {
            Ok(v) => v,
            Err(_) => api_addr.replacen("api", "uaa", 1),
        };

        let transfer_addr = std::env::var("TRANSFER_ADDR")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        Ok(Self {
            port,
            repo_url: required("REPO_URL")?,
            plan_path: required("PLAN_PATH")?,
            api_addr,
            uaa_addr,
            client_id: required("CLIENT_ID")?,
            refresh_token: required("REFRESH_TOKEN")?,
            skip_tls_validation: std::env::var("SKIP_TLS_VALIDATION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            app_guid: required("APP_GUID")?,
            transfer_addr,
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| PlanwatchError::Config(format!("missing required environment variable {name}")))
}
