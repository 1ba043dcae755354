use super::{ProxyHandlers, ProxyRequest, ProxyResponse};
use crate::core::request::ClientError;
use crate::utils::error::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorReport {
    error: ClientError,
}

impl ProxyHandlers {
    /// Writes a client reported failure to the function log.
    pub fn error_logger(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        let envelope = request.envelope::<ErrorReport>()?;
        let error = envelope.params.error;

        tracing::error!(
            request_id = %envelope.request_id,
            action = %error.action,
            resource = %error.resource,
            "Client error: {}",
            error.message
        );

        Ok(ProxyResponse::json(
            200,
            &serde_json::json!({ "logged": true, "requestId": envelope.request_id }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::lambda::LambdaConfig;
    use crate::serverless::system_token::StaticTokenProvider;
    use std::sync::Arc;

    fn handlers() -> ProxyHandlers {
        let config = LambdaConfig {
            cmr_host: "http://cmr.example.com".to_string(),
            cwic_host: "http://cwic.example.com".to_string(),
            cwic_client_id: "eed-edsc".to_string(),
            client_id: "clientId".to_string(),
            system_username: "edsc".to_string(),
            system_password: "secret".to_string(),
            request_timeout_seconds: 30,
        };
        ProxyHandlers::new(
            reqwest::Client::new(),
            &config,
            Arc::new(StaticTokenProvider::new("system-token")),
        )
    }

    #[test]
    fn test_error_logger_acknowledges_report() {
        let request = ProxyRequest::post(
            "/error_logger",
            serde_json::json!({
                "requestId": "req-1",
                "params": {
                    "error": {
                        "message": "Upstream returned HTTP 500",
                        "action": "getSearchGranules",
                        "resource": "granules"
                    }
                }
            }),
        );

        let response = handlers().error_logger(&request).unwrap();

        assert_eq!(response.status_code, 200);
        assert!(response.body.contains("req-1"));
    }

    #[test]
    fn test_malformed_report_is_rejected() {
        let request = ProxyRequest::post("/error_logger", serde_json::json!({ "params": {} }));
        assert!(handlers().error_logger(&request).is_err());
    }
}
