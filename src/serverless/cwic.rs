use super::{ProxyHandlers, ProxyRequest, ProxyResponse};
use crate::core::request::ensure_success;
use crate::domain::search::CwicSearchParams;
use crate::utils::error::Result;

/// OpenSearch query for the CWIC granule endpoint. `startIndex` is 1-based.
pub fn cwic_query(client_id: &str, params: &CwicSearchParams) -> Vec<(String, String)> {
    let page_size = params.page_size.max(1);
    let start_index = (params.page_num.max(1) - 1) * page_size + 1;

    let mut query = vec![
        ("clientId".to_string(), client_id.to_string()),
        ("datasetId".to_string(), params.echo_collection_id.clone()),
        ("startIndex".to_string(), start_index.to_string()),
        ("count".to_string(), page_size.to_string()),
    ];

    if let Some(bounding_box) = &params.bounding_box {
        query.push(("boundingBox".to_string(), bounding_box.clone()));
    }

    if let Some(temporal) = &params.temporal {
        let mut bounds = temporal.splitn(2, ',');
        if let Some(start) = bounds.next().filter(|s| !s.is_empty()) {
            query.push(("timeStart".to_string(), start.to_string()));
        }
        if let Some(end) = bounds.next().filter(|s| !s.is_empty()) {
            query.push(("timeEnd".to_string(), end.to_string()));
        }
    }

    query
}

impl ProxyHandlers {
    /// Forwards a granule search to CWIC and hands back the Atom feed untouched.
    pub async fn cwic_granule_search(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let envelope = request.envelope::<CwicSearchParams>()?;
        tracing::info!(
            request_id = %envelope.request_id,
            "CWIC granule search for {}",
            envelope.params.echo_collection_id
        );

        let url = format!("{}/opensearch/granules.atom", self.cwic_host);
        let response = self
            .client
            .get(&url)
            .query(&cwic_query(&self.cwic_client_id, &envelope.params))
            .send()
            .await?;
        let response = ensure_success(response)?;

        let body = response.text().await?;
        Ok(ProxyResponse::new(200, "application/atom+xml", body))
    }
}
