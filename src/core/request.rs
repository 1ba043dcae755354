use crate::core::cwic::{parse_cwic_feed, CwicFeed};
use crate::domain::model::Granule;
use crate::domain::ports::GranuleRequest;
use crate::domain::search::{
    CwicSearchParams, GranuleSearchParams, GranuleSearchResponse, LambdaEnvelope, OusParams,
};
use crate::utils::error::{Result, SearchError};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const HITS_HEADER: &str = "cmr-hits";
pub const JWT_HEADER: &str = "jwt-token";

#[derive(Debug, Default, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feed: Feed,
}

#[derive(Debug, Default, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Granule>,
}

#[derive(Debug, Default, Deserialize)]
struct OusResponse {
    #[serde(default)]
    items: Vec<String>,
}

pub(crate) fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(SearchError::HttpStatusError {
        status: status.as_u16(),
        url: response.url().to_string(),
    })
}

pub(crate) fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn hits_from_headers(headers: &HeaderMap) -> u64 {
    header_value(headers, HITS_HEADER)
        .and_then(|hits| hits.trim().parse().ok())
        .unwrap_or(0)
}

fn envelope<P: Serialize>(params: P) -> LambdaEnvelope<P> {
    LambdaEnvelope {
        request_id: Uuid::new_v4().to_string(),
        params,
    }
}

fn trim_host(host: &str) -> &str {
    host.trim_end_matches('/')
}

/// Unauthenticated granule search straight against CMR.
#[derive(Debug, Clone)]
pub struct CmrGranuleRequest {
    client: Client,
    cmr_host: String,
}

impl CmrGranuleRequest {
    pub fn new(client: Client, cmr_host: &str) -> Self {
        Self {
            client,
            cmr_host: trim_host(cmr_host).to_string(),
        }
    }
}

#[async_trait]
impl GranuleRequest for CmrGranuleRequest {
    async fn search(&self, params: &GranuleSearchParams) -> Result<GranuleSearchResponse> {
        let url = format!("{}/search/granules.json", self.cmr_host);
        tracing::debug!("POST {} (collection {})", url, params.echo_collection_id);

        let response = self
            .client
            .post(&url)
            .form(&params.to_form_pairs())
            .send()
            .await?;
        let response = ensure_success(response)?;

        let hits = hits_from_headers(response.headers());
        let body: FeedResponse = response.json().await?;

        Ok(GranuleSearchResponse {
            entries: body.feed.entry,
            hits,
            jwt_token: None,
        })
    }
}

/// Authenticated granule search through the lambda proxy.
#[derive(Debug, Clone)]
pub struct LambdaGranuleRequest {
    client: Client,
    api_host: String,
    auth_token: String,
}

impl LambdaGranuleRequest {
    pub fn new(client: Client, api_host: &str, auth_token: &str) -> Self {
        Self {
            client,
            api_host: trim_host(api_host).to_string(),
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl GranuleRequest for LambdaGranuleRequest {
    async fn search(&self, params: &GranuleSearchParams) -> Result<GranuleSearchResponse> {
        let url = format!("{}/granules", self.api_host);
        tracing::debug!("POST {} (collection {})", url, params.echo_collection_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(&envelope(params))
            .send()
            .await?;
        let response = ensure_success(response)?;

        let hits = hits_from_headers(response.headers());
        let jwt_token = header_value(response.headers(), JWT_HEADER);
        let body: FeedResponse = response.json().await?;

        Ok(GranuleSearchResponse {
            entries: body.feed.entry,
            hits,
            jwt_token,
        })
    }
}

/// Granule search for CWIC collections, answered with OpenSearch Atom XML.
#[derive(Debug, Clone)]
pub struct CwicGranuleRequest {
    client: Client,
    api_host: String,
    auth_token: String,
}

impl CwicGranuleRequest {
    pub fn new(client: Client, api_host: &str, auth_token: &str) -> Self {
        Self {
            client,
            api_host: trim_host(api_host).to_string(),
            auth_token: auth_token.to_string(),
        }
    }

    pub async fn search(&self, params: &CwicSearchParams) -> Result<CwicFeed> {
        let url = format!("{}/cwic/granules", self.api_host);
        tracing::debug!("POST {} (collection {})", url, params.echo_collection_id);

        let mut request = self.client.post(&url).json(&envelope(params));
        if !self.auth_token.is_empty() {
            request = request.bearer_auth(&self.auth_token);
        }
        let response = ensure_success(request.send().await?)?;

        let body = response.text().await?;
        parse_cwic_feed(&body)
    }
}

/// OPeNDAP subsetting links through the lambda proxy.
#[derive(Debug, Clone)]
pub struct OusRequest {
    client: Client,
    api_host: String,
    auth_token: String,
}

impl OusRequest {
    pub fn new(client: Client, api_host: &str, auth_token: &str) -> Self {
        Self {
            client,
            api_host: trim_host(api_host).to_string(),
            auth_token: auth_token.to_string(),
        }
    }

    pub async fn search(&self, params: &OusParams) -> Result<Vec<String>> {
        let url = format!("{}/ous", self.api_host);
        tracing::debug!("POST {} (collection {})", url, params.echo_collection_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(&envelope(params))
            .send()
            .await?;
        let response = ensure_success(response)?;

        let body: OusResponse = response.json().await?;
        Ok(body.items)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientError {
    pub message: String,
    pub action: String,
    pub resource: String,
}

/// Forwards client-side failures to the error logger lambda.
#[derive(Debug, Clone)]
pub struct ErrorLogger {
    client: Client,
    api_host: String,
}

impl ErrorLogger {
    pub fn new(client: Client, api_host: &str) -> Self {
        Self {
            client,
            api_host: trim_host(api_host).to_string(),
        }
    }

    /// Logs locally and reports upstream. A failing logger never masks the
    /// original error.
    pub async fn report(&self, error: &SearchError, action: &str, resource: &str) {
        tracing::error!(
            "❌ {} failed while fetching {}: {} (category: {:?})",
            action,
            resource,
            error,
            error.category()
        );

        let client_error = ClientError {
            message: error.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
        };
        let payload = serde_json::json!({ "error": client_error });

        let url = format!("{}/error_logger", self.api_host);
        let result = self.client.post(&url).json(&envelope(payload)).send().await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!("Error logger responded with HTTP {}", response.status());
            }
            Err(e) => {
                tracing::warn!("Unable to reach error logger: {}", e);
            }
        }
    }
}
