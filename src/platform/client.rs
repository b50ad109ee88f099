// src/platform/client.rs

//! The platform's task API: create tasks, list tasks with pagination.
//!
//! Every call carries an `Authorization` header from the token fetcher. The
//! cached token is discarded after the first non-2xx response and the call
//! is retried once with a fresh one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::{PlanwatchError, Result};
use crate::platform::token::TokenFetcher;
use crate::scheduler::TaskCreator;

/// Deadline for any single platform API call.
pub const API_TIMEOUT: Duration = Duration::from_secs(15);

pub struct PlatformClient {
    api_addr: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenFetcher>,
    cached_token: Mutex<Option<String>>,
}

#[derive(Deserialize)]
struct TaskPage {
    #[serde(default)]
    pagination: Pagination,
    #[serde(default)]
    resources: Vec<TaskResource>,
}

#[derive(Deserialize, Default)]
struct Pagination {
    #[serde(default)]
    next: Option<PageRef>,
}

#[derive(Deserialize)]
struct PageRef {
    #[serde(default)]
    href: String,
}

#[derive(Deserialize)]
struct TaskResource {
    #[serde(default)]
    name: String,
}

impl PlatformClient {
    /// `skip_tls_validation` disables certificate verification for
    /// deployments fronted by self-signed certs.
    pub fn new(
        api_addr: String,
        tokens: Arc<dyn TokenFetcher>,
        skip_tls_validation: bool,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .danger_accept_invalid_certs(skip_tls_validation)
            .build()?;

        Ok(Self {
            api_addr,
            http,
            tokens,
            cached_token: Mutex::new(None),
        })
    }

    async fn authorization(&self) -> Result<String> {
        if let Some(token) = self.cached_token.lock().unwrap().clone() {
            return Ok(token);
        }

        let token = self.tokens.get_token().await?;
        *self.cached_token.lock().unwrap() = Some(token.clone());
        Ok(token)
    }

    fn discard_token(&self) {
        *self.cached_token.lock().unwrap() = None;
    }

    /// Send `build()`-produced requests with one refresh-and-retry on a
    /// non-2xx response.
    async fn send_authorized(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let token = self.authorization().await?;
        let response = build()
            .header("Authorization", token.as_str())
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response);
        }

        debug!(status = %response.status(), "platform response not 2xx; refreshing token");
        self.discard_token();
        let token = self.authorization().await?;
        Ok(build()
            .header("Authorization", token.as_str())
            .send()
            .await?)
    }
}

#[async_trait]
impl TaskCreator for PlatformClient {
    /// `POST /v3/apps/{guid}/tasks`; anything but 202 is an error.
    async fn create_task(&self, command: &str, name: &str, app_guid: &str) -> Result<()> {
        let url = format!("{}/v3/apps/{}/tasks", self.api_addr, app_guid);
        let body = json!({
            "command": command,
            "name": name,
        });

        let response = self
            .send_authorized(|| self.http.post(&url).json(&body))
            .await?;

        let status = response.status();
        if status.as_u16() != 202 {
            let text = response.text().await.unwrap_or_default();
            return Err(PlanwatchError::Platform(format!(
                "unexpected status code {status}: {text}"
            )));
        }

        Ok(())
    }

    /// `GET /v3/apps/{guid}/tasks`, following `pagination.next.href` until
    /// empty; returns the task names.
    async fn list_tasks(&self, app_guid: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut url = format!("{}/v3/apps/{}/tasks", self.api_addr, app_guid);

        loop {
            let response = self.send_authorized(|| self.http.get(&url)).await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(PlanwatchError::Platform(format!(
                    "unexpected status code {status}: {text}"
                )));
            }

            let page: TaskPage = response.json().await?;
            names.extend(page.resources.into_iter().map(|r| r.name));

            match page.pagination.next {
                Some(next) if !next.href.is_empty() => url = next.href,
                _ => return Ok(names),
            }
        }
    }
}
