use crate::config::lambda::LambdaConfig;
use crate::core::request::ensure_success;
use crate::domain::ports::SystemTokenProvider;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Fixed token, for tests and local runs.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl SystemTokenProvider for StaticTokenProvider {
    async fn system_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenId,
}

#[derive(Debug, Deserialize)]
struct TokenId {
    id: String,
}

/// Requests a system token from CMR's legacy token service once per
/// container and reuses it afterwards.
pub struct LegacyTokenProvider {
    client: Client,
    cmr_host: String,
    username: String,
    password: String,
    client_id: String,
    cached: Mutex<Option<String>>,
}

impl LegacyTokenProvider {
    pub fn new(client: Client, config: &LambdaConfig) -> Self {
        Self {
            client,
            cmr_host: config.cmr_host.trim_end_matches('/').to_string(),
            username: config.system_username.clone(),
            password: config.system_password.clone(),
            client_id: config.client_id.clone(),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SystemTokenProvider for LegacyTokenProvider {
    async fn system_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let url = format!("{}/legacy-services/rest/tokens.json", self.cmr_host);
        tracing::debug!("Requesting system token from {}", url);

        let body = serde_json::json!({
            "token": {
                "username": self.username,
                "password": self.password,
                "client_id": self.client_id,
                "user_ip_address": "127.0.0.1"
            }
        });
        let response = ensure_success(self.client.post(&url).json(&body).send().await?)?;
        let token: TokenResponse = response.json().await?;

        *cached = Some(token.token.id.clone());
        Ok(token.token.id)
    }
}
