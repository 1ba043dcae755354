#[cfg(feature = "cli")]
pub mod cli;
pub mod lambda;
pub mod toml_config;

use crate::domain::ports::EndpointConfig;
use crate::utils::error::{Result, SearchError};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "http://localhost:3001";
pub const DEFAULT_CWIC_HOST: &str = "https://cwic.wgiss.ceos.org";

/// Hosts and paging for one Earthdata environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthdataConfig {
    pub environment: String,
    pub cmr_host: String,
    pub api_host: String,
    pub granule_page_size: u32,
    pub link_page_size: u32,
    pub request_timeout_seconds: u64,
}

impl Default for EarthdataConfig {
    fn default() -> Self {
        Self::with_cmr_host("prod", "https://cmr.earthdata.nasa.gov")
    }
}

impl EarthdataConfig {
    fn with_cmr_host(environment: &str, cmr_host: &str) -> Self {
        Self {
            environment: environment.to_string(),
            cmr_host: cmr_host.to_string(),
            api_host: DEFAULT_API_HOST.to_string(),
            granule_page_size: 20,
            link_page_size: 500,
            request_timeout_seconds: 30,
        }
    }

    fn builtin(environment: &str) -> Option<Self> {
        let cmr_host = match environment {
            "prod" => "https://cmr.earthdata.nasa.gov",
            "uat" => "https://cmr.uat.earthdata.nasa.gov",
            "sit" => "https://cmr.sit.earthdata.nasa.gov",
            _ => return None,
        };
        Some(Self::with_cmr_host(environment, cmr_host))
    }

    /// Built-in settings for `prod`, `uat` or `sit`.
    pub fn for_environment(environment: &str) -> Result<Self> {
        Self::builtin(environment).ok_or_else(|| SearchError::InvalidConfigValueError {
            field: "environment".to_string(),
            value: environment.to_string(),
            reason: "Unknown environment. Valid environments: prod, uat, sit".to_string(),
        })
    }

    /// Applies `CMR_HOST` and `API_HOST` when they are set.
    pub fn apply_env_overrides(&mut self) {
        for (name, target) in [
            ("CMR_HOST", &mut self.cmr_host),
            ("API_HOST", &mut self.api_host),
        ] {
            if let Ok(value) = std::env::var(name) {
                tracing::debug!("{} overridden from environment", name);
                *target = value;
            }
        }
    }

    pub fn http_client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_seconds))
            .build()?)
    }
}

impl EndpointConfig for EarthdataConfig {
    fn cmr_host(&self) -> &str {
        &self.cmr_host
    }

    fn api_host(&self) -> &str {
        &self.api_host
    }

    fn granule_page_size(&self) -> u32 {
        self.granule_page_size
    }

    fn link_page_size(&self) -> u32 {
        self.link_page_size
    }
}

impl Validate for EarthdataConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("environment", &self.environment)?;
        validate_url("cmr_host", &self.cmr_host)?;
        validate_url("api_host", &self.api_host)?;

        // CMR caps page_size at 2000
        validate_range("granule_page_size", self.granule_page_size, 1, 2000)?;
        validate_range("link_page_size", self.link_page_size, 1, 2000)?;
        validate_positive_number(
            "request_timeout_seconds",
            self.request_timeout_seconds as usize,
            1,
        )?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
