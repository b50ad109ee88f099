// src/platform/token.rs

//! OAuth refresh-token exchange.
//!
//! The exchange returns both an access token and a rotated refresh token;
//! the fetcher stores the rotation so the next exchange uses the fresh one.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::{PlanwatchError, Result};

#[async_trait]
pub trait TokenFetcher: Send + Sync {
    /// Produce an `Authorization` header value.
    async fn get_token(&self) -> Result<String>;
}

pub struct UaaTokenFetcher {
    uaa_addr: String,
    client_id: String,
    refresh_token: Mutex<String>,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl UaaTokenFetcher {
    pub fn new(
        uaa_addr: String,
        client_id: String,
        refresh_token: String,
        http: reqwest::Client,
    ) -> Self {
        Self {
            uaa_addr,
            client_id,
            refresh_token: Mutex::new(refresh_token),
            http,
        }
    }
}

#[async_trait]
impl TokenFetcher for UaaTokenFetcher {
    async fn get_token(&self) -> Result<String> {
        let refresh_token = self.refresh_token.lock().unwrap().clone();

        let response = self
            .http
            .post(format!("{}/oauth/token", self.uaa_addr))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlanwatchError::Platform(format!(
                "token exchange returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await?;

        if let Some(rotated) = token.refresh_token {
            *self.refresh_token.lock().unwrap() = rotated;
        }

        let token_type = token.token_type.unwrap_or_else(|| "bearer".to_string());
        Ok(format!("{} {}", token_type, token.access_token))
    }
}
