use crate::domain::model::Action;
use crate::domain::search::{GranuleSearchParams, GranuleSearchResponse};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Receives state-transition actions in the order they are produced.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, action: Action);
}

/// Fire-and-forget notifications for the map layer.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}

pub trait EndpointConfig: Send + Sync {
    fn cmr_host(&self) -> &str;
    fn api_host(&self) -> &str;
    fn granule_page_size(&self) -> u32;
    fn link_page_size(&self) -> u32;
}

#[async_trait]
pub trait GranuleRequest: Send + Sync {
    async fn search(&self, params: &GranuleSearchParams) -> Result<GranuleSearchResponse>;
}

#[async_trait]
pub trait SystemTokenProvider: Send + Sync {
    async fn system_token(&self) -> Result<String>;
}
