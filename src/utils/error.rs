use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Spatial error: {message}")]
    SpatialError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Parsing,
    Configuration,
    Input,
    Authentication,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SearchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SearchError::ApiError(_) => ErrorCategory::Network,
            SearchError::HttpStatusError { .. } => ErrorCategory::Upstream,
            SearchError::XmlError(_)
            | SearchError::SerializationError(_)
            | SearchError::TomlError(_) => ErrorCategory::Parsing,
            SearchError::ConfigError { .. } | SearchError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            SearchError::SpatialError { .. } | SearchError::ValidationError { .. } => {
                ErrorCategory::Input
            }
            SearchError::Unauthorized { .. } => ErrorCategory::Authentication,
            SearchError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SearchError::ApiError(_) => ErrorSeverity::Medium,
            SearchError::HttpStatusError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            SearchError::HttpStatusError { .. } => ErrorSeverity::High,
            SearchError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the configured hosts",
            ErrorCategory::Upstream => "The upstream service rejected the request; try again later",
            ErrorCategory::Parsing => "The response or file was malformed; check its contents",
            ErrorCategory::Configuration => "Review the configuration file and environment variables",
            ErrorCategory::Input => "Check the spatial and query parameters in the search state",
            ErrorCategory::Authentication => "Log in again to obtain a fresh token",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SearchError::HttpStatusError { status, .. } => {
                format!("The search service responded with an error (HTTP {})", status)
            }
            SearchError::ApiError(_) => "Unable to reach the search service".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
