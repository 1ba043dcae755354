use earthdata_search::serverless::system_token::LegacyTokenProvider;
use earthdata_search::utils::{logger, validation::Validate};
use earthdata_search::{LambdaConfig, ProxyHandlers, ProxyRequest, ProxyResponse};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use std::time::Duration;

async fn function_handler(
    event: LambdaEvent<ProxyRequest>,
    handlers: &ProxyHandlers,
) -> Result<ProxyResponse, Error> {
    tracing::info!(request_id = %event.context.request_id, "Handling proxy event");
    Ok(handlers.handle(event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = LambdaConfig::from_env()?;
    config.validate()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .build()?;
    let token_provider = Arc::new(LegacyTokenProvider::new(client.clone(), &config));
    let handlers = Arc::new(ProxyHandlers::new(client, &config, token_provider));

    run(service_fn(move |event: LambdaEvent<ProxyRequest>| {
        let handlers = Arc::clone(&handlers);
        async move { function_handler(event, &handlers).await }
    }))
    .await
}
