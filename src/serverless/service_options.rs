use super::{ProxyHandlers, ProxyRequest, ProxyResponse};
use crate::core::request::ensure_success;
use crate::utils::error::{Result, SearchError};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOptionDefinition {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct EchoFormResponse {
    #[serde(default)]
    service_option_definition: EchoForm,
}

#[derive(Debug, Default, Deserialize)]
struct EchoForm {
    #[serde(default)]
    form: Option<String>,
}

impl ProxyHandlers {
    /// Fetches the ECHO form for each definition with the system token.
    /// Results keep the input order and are keyed `esi0`, `esi1`, ...
    pub async fn get_service_option_definitions(
        &self,
        definitions: &[ServiceOptionDefinition],
    ) -> Result<Vec<Value>> {
        tracing::debug!("Fetching {} service option definitions", definitions.len());
        let system_token = self.token_provider.system_token().await?;

        let requests = definitions.iter().enumerate().map(|(index, definition)| {
            let system_token = system_token.clone();
            async move {
                let url = format!(
                    "{}/legacy-services/rest/service_option_definitions/{}.json",
                    self.cmr_host, definition.id
                );
                let response = self
                    .client
                    .get(&url)
                    .header("Echo-Token", system_token)
                    .send()
                    .await?;
                let response = ensure_success(response)?;
                let body: EchoFormResponse = response.json().await?;

                let mut entry = Map::new();
                entry.insert(
                    format!("esi{}", index),
                    serde_json::json!({
                        "form": body.service_option_definition.form,
                        "service_option_definition": definition,
                    }),
                );
                Ok::<Value, SearchError>(Value::Object(entry))
            }
        });

        // `buffered` runs every request at once but yields in input order
        stream::iter(requests)
            .buffered(definitions.len().max(1))
            .try_collect()
            .await
    }

    pub async fn service_option_definitions(
        &self,
        request: &ProxyRequest,
    ) -> Result<ProxyResponse> {
        // Callers must be signed in even though the forms are fetched as the system user
        request.require_token()?;
        let envelope = request.envelope::<Vec<ServiceOptionDefinition>>()?;
        tracing::info!(
            request_id = %envelope.request_id,
            "Service option definitions for {} entries",
            envelope.params.len()
        );

        let forms = self
            .get_service_option_definitions(&envelope.params)
            .await?;
        Ok(ProxyResponse::json(200, &Value::Array(forms)))
    }
}
