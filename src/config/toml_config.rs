use crate::config::EarthdataConfig;
use crate::utils::error::{Result, SearchError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-environment overrides read from an `earthdata.toml` file:
///
/// ```toml
/// environment = "uat"
///
/// [environments.uat]
/// api_host = "${EDSC_API_HOST}"
/// granule_page_size = 50
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub environment: Option<String>,
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentOverrides {
    pub cmr_host: Option<String>,
    pub api_host: Option<String>,
    pub granule_page_size: Option<u32>,
    pub link_page_size: Option<u32>,
    pub request_timeout_seconds: Option<u64>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the variable's value, leaving unknown names as-is.
    fn substitute_env_vars(content: &str) -> String {
        let Ok(re) = Regex::new(r"\$\{([^}]+)\}") else {
            return content.to_string();
        };

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// Settings for the chosen environment: `selected`, else the file's
    /// `environment`, else `prod`. Environments other than the built-in ones
    /// must at least name their CMR host.
    pub fn resolve(&self, selected: Option<&str>) -> Result<EarthdataConfig> {
        let environment = selected
            .or(self.environment.as_deref())
            .unwrap_or("prod");
        let overrides = self.environments.get(environment).cloned().unwrap_or_default();

        let mut config = match EarthdataConfig::for_environment(environment) {
            Ok(config) => config,
            Err(e) => {
                let Some(cmr_host) = overrides.cmr_host.clone() else {
                    return Err(e);
                };
                EarthdataConfig {
                    environment: environment.to_string(),
                    cmr_host,
                    ..EarthdataConfig::default()
                }
            }
        };

        if let Some(cmr_host) = overrides.cmr_host {
            config.cmr_host = cmr_host;
        }
        if let Some(api_host) = overrides.api_host {
            config.api_host = api_host;
        }
        if let Some(page_size) = overrides.granule_page_size {
            config.granule_page_size = page_size;
        }
        if let Some(page_size) = overrides.link_page_size {
            config.link_page_size = page_size;
        }
        if let Some(timeout) = overrides.request_timeout_seconds {
            config.request_timeout_seconds = timeout;
        }

        Ok(config)
    }
}

/// Loads the file when given, falls back to built-in settings otherwise, then
/// applies host overrides from the environment.
pub fn load_config(path: Option<&Path>, environment: Option<&str>) -> Result<EarthdataConfig> {
    let toml_config = match path {
        Some(path) => TomlConfig::from_file(path).map_err(|e| SearchError::ConfigError {
            message: format!("Failed to load {}: {}", path.display(), e),
        })?,
        None => TomlConfig::default(),
    };

    let mut config = toml_config.resolve(environment)?;
    config.apply_env_overrides();
    Ok(config)
}
