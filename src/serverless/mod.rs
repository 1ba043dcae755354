//! Server side of the proxy endpoints the browser client talks to.
//!
//! Each handler receives an API Gateway style event and answers with a
//! proxy response, so the same code runs behind `lambda_runtime` and in tests.

pub mod cwic;
pub mod error_logger;
pub mod granules;
pub mod ous;
pub mod service_options;
pub mod system_token;

use crate::config::lambda::LambdaConfig;
use crate::domain::ports::SystemTokenProvider;
use crate::domain::search::LambdaEnvelope;
use crate::utils::error::{ErrorCategory, Result, SearchError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_method")]
    pub http_method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "POST".to_string()
}

impl ProxyRequest {
    pub fn post(path: &str, body: serde_json::Value) -> Self {
        Self {
            path: path.to_string(),
            http_method: default_method(),
            headers: HashMap::new(),
            body: Some(body.to_string()),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Header lookup ignoring case, since gateways differ in how they pass names.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub fn require_token(&self) -> Result<&str> {
        self.bearer_token().ok_or_else(|| SearchError::Unauthorized {
            message: format!("{} requires a bearer token", self.path),
        })
    }

    /// Parses the `{requestId, params}` body sent by the client.
    pub fn envelope<P: DeserializeOwned>(&self) -> Result<LambdaEnvelope<P>> {
        let body = self.body.as_deref().unwrap_or("{}");
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    pub fn new(status_code: u16, content_type: &str, body: String) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn json(status_code: u16, body: &serde_json::Value) -> Self {
        Self::new(status_code, "application/json", body.to_string())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn from_error(error: &SearchError) -> Self {
        let status_code = match error {
            SearchError::HttpStatusError { status, .. } => *status,
            SearchError::Unauthorized { .. } => 401,
            other => match other.category() {
                ErrorCategory::Input | ErrorCategory::Parsing => 400,
                _ => 500,
            },
        };
        Self::json(
            status_code,
            &serde_json::json!({ "errors": [error.to_string()] }),
        )
    }
}

/// Routes proxy events to their handlers.
pub struct ProxyHandlers {
    pub(crate) client: Client,
    pub(crate) cmr_host: String,
    pub(crate) cwic_host: String,
    pub(crate) cwic_client_id: String,
    pub(crate) token_provider: Arc<dyn SystemTokenProvider>,
}

impl ProxyHandlers {
    pub fn new(
        client: Client,
        config: &LambdaConfig,
        token_provider: Arc<dyn SystemTokenProvider>,
    ) -> Self {
        Self {
            client,
            cmr_host: config.cmr_host.trim_end_matches('/').to_string(),
            cwic_host: config.cwic_host.trim_end_matches('/').to_string(),
            cwic_client_id: config.cwic_client_id.clone(),
            token_provider,
        }
    }

    pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse {
        let method = request.http_method.to_ascii_uppercase();
        let path = request.path.trim_end_matches('/');
        tracing::info!("{} {}", method, path);

        let result = match (method.as_str(), path) {
            ("POST", "/granules") => self.granule_search(&request).await,
            ("POST", "/cwic/granules") => self.cwic_granule_search(&request).await,
            ("POST", "/ous") => self.ous(&request).await,
            ("POST", "/service_option_definitions") => {
                self.service_option_definitions(&request).await
            }
            ("POST", "/error_logger") => self.error_logger(&request),
            _ => Ok(ProxyResponse::json(
                404,
                &serde_json::json!({ "errors": [format!("No route for {} {}", method, path)] }),
            )),
        };

        result.unwrap_or_else(|e| {
            tracing::error!(
                "❌ {} {} failed: {} (category: {:?})",
                method,
                path,
                e,
                e.category()
            );
            ProxyResponse::from_error(&e)
        })
    }
}
