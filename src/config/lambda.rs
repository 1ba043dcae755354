use crate::utils::error::{Result, SearchError};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use std::env;

/// Settings for the proxy lambdas, read from the function's environment.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub cmr_host: String,
    pub cwic_host: String,
    pub cwic_client_id: String,
    pub client_id: String,
    pub system_username: String,
    pub system_password: String,
    pub request_timeout_seconds: u64,
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| SearchError::ConfigError {
        message: format!("{} environment variable is required", name),
    })
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cmr_host: env::var("CMR_HOST")
                .unwrap_or_else(|_| "https://cmr.earthdata.nasa.gov".to_string()),
            cwic_host: env::var("CWIC_HOST")
                .unwrap_or_else(|_| crate::config::DEFAULT_CWIC_HOST.to_string()),
            cwic_client_id: env::var("CWIC_CLIENT_ID").unwrap_or_else(|_| "eed-edsc".to_string()),
            client_id: required_var("EDL_CLIENT_ID")?,
            system_username: required_var("CMR_SYSTEM_USERNAME")?,
            system_password: required_var("CMR_SYSTEM_PASSWORD")?,
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_url("cmr_host", &self.cmr_host)?;
        validate_url("cwic_host", &self.cwic_host)?;
        validate_non_empty_string("cwic_client_id", &self.cwic_client_id)?;
        validate_non_empty_string("client_id", &self.client_id)?;
        validate_non_empty_string("system_username", &self.system_username)?;
        validate_non_empty_string("system_password", &self.system_password)?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LambdaConfig {
        LambdaConfig {
            cmr_host: "http://cmr.example.com".to_string(),
            cwic_host: "http://cwic.example.com".to_string(),
            cwic_client_id: "eed-edsc".to_string(),
            client_id: "clientId".to_string(),
            system_username: "edsc".to_string(),
            system_password: "secret".to_string(),
            request_timeout_seconds: 30,
        }
    }

    #[test]
    fn test_valid_lambda_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_blank_credentials_are_rejected() {
        let mut invalid = config();
        invalid.system_password = "  ".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.cmr_host = "cmr".to_string();
        assert!(invalid.validate().is_err());
    }
}
