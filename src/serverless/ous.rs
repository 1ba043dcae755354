use super::{ProxyHandlers, ProxyRequest, ProxyResponse};
use crate::core::request::ensure_success;
use crate::domain::search::OusParams;
use crate::utils::error::Result;
use crate::utils::validation::validate_concept_id;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct ServiceBridgeResponse {
    #[serde(default)]
    items: Vec<String>,
}

/// Query for the service bridge. List values are comma separated.
pub fn ous_query(params: &OusParams) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();

    if let Some(format) = &params.format {
        query.push(("format", format.clone()));
    }
    if !params.variables.is_empty() {
        query.push(("variables", params.variables.join(",")));
    }
    if let Some(bounding_box) = &params.bounding_box {
        query.push(("bounding_box", bounding_box.clone()));
    }
    if !params.granules.is_empty() {
        query.push(("granules", params.granules.join(",")));
    }
    if let Some(exclude) = params.exclude_granules {
        query.push(("exclude_granules", exclude.to_string()));
    }

    query
}

impl ProxyHandlers {
    /// Resolves OPeNDAP subsetting URLs through CMR's service bridge.
    pub async fn ous(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let token = request.require_token()?;
        let envelope = request.envelope::<OusParams>()?;
        validate_concept_id("echo_collection_id", &envelope.params.echo_collection_id)?;
        let collection_id = &envelope.params.echo_collection_id;
        tracing::info!(request_id = %envelope.request_id, "OUS request for {}", collection_id);

        let url = format!(
            "{}/service-bridge/ous/collection/{}",
            self.cmr_host, collection_id
        );
        let response = self
            .client
            .get(&url)
            .header("Echo-Token", token)
            .query(&ous_query(&envelope.params))
            .send()
            .await?;
        let response = ensure_success(response)?;

        let body: ServiceBridgeResponse = response.json().await?;
        tracing::debug!("Service bridge returned {} links", body.items.len());

        Ok(ProxyResponse::json(
            200,
            &serde_json::json!({ "items": body.items }),
        ))
    }
}
