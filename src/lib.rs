pub mod config;
pub mod core;
pub mod domain;
pub mod serverless;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::lambda::LambdaConfig;
pub use config::EarthdataConfig;
pub use core::granules::GranuleActions;
pub use core::store::{ActionLog, EventLog};
pub use domain::model::{Action, SearchState};
pub use serverless::{ProxyHandlers, ProxyRequest, ProxyResponse};
pub use utils::error::{Result, SearchError};
