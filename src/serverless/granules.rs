use super::{ProxyHandlers, ProxyRequest, ProxyResponse};
use crate::core::request::{ensure_success, header_value, HITS_HEADER, JWT_HEADER};
use crate::domain::search::GranuleSearchParams;
use crate::utils::error::Result;
use crate::utils::validation::validate_concept_id;

impl ProxyHandlers {
    /// Forwards a granule search to CMR on behalf of a logged in user.
    pub async fn granule_search(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let token = request.require_token()?;
        let envelope = request.envelope::<GranuleSearchParams>()?;
        validate_concept_id("echo_collection_id", &envelope.params.echo_collection_id)?;
        tracing::info!(
            request_id = %envelope.request_id,
            "Granule search for {}",
            envelope.params.echo_collection_id
        );

        let url = format!("{}/search/granules.json", self.cmr_host);
        let response = self
            .client
            .post(&url)
            .header("Echo-Token", token)
            .form(&envelope.params.to_form_pairs())
            .send()
            .await?;
        let response = ensure_success(response)?;

        let hits = header_value(response.headers(), HITS_HEADER).unwrap_or_else(|| "0".to_string());
        let body = response.text().await?;

        Ok(ProxyResponse::new(200, "application/json", body)
            .with_header(HITS_HEADER, &hits)
            .with_header(JWT_HEADER, token))
    }
}
