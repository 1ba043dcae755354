use anyhow::Context;
use clap::Parser;
use earthdata_search::config::cli::{CliConfig, Command, MbrArgs};
use earthdata_search::config::toml_config::load_config;
use earthdata_search::core::handoffs::fetch_open_altimetry_handoff_url;
use earthdata_search::core::spatial::mbr;
use earthdata_search::domain::model::{RetrievalCollection, Spatial};
use earthdata_search::utils::error::{ErrorSeverity, SearchError};
use earthdata_search::utils::{logger, validation::Validate};
use earthdata_search::{ActionLog, EarthdataConfig, GranuleActions, SearchState};
use serde::de::DeserializeOwned;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path) -> earthdata_search::Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value).context("Failed to serialize output")?);
    Ok(())
}

fn mbr_spatial(args: &MbrArgs) -> Spatial {
    Spatial {
        bounding_box: args.bounding_box.iter().cloned().collect(),
        polygon: args.polygon.iter().cloned().collect(),
        point: args.point.iter().cloned().collect(),
        circle: args.circle.iter().cloned().collect(),
    }
}

async fn run(
    command: &Command,
    config: EarthdataConfig,
    dispatch: &ActionLog,
) -> earthdata_search::Result<()> {
    let client = config.http_client()?;
    let actions = GranuleActions::with_client(config, client);

    match command {
        Command::Granules(args) => {
            let state: SearchState = read_json(&args.state)?;
            actions.get_search_granules(dispatch, &state).await?;
        }
        Command::Project(args) => {
            let state: SearchState = read_json(&args.state)?;
            let outcomes = actions.get_project_granules(dispatch, &state).await;
            let failed = outcomes.into_iter().filter_map(|outcome| outcome.err());
            if let Some(error) = failed.last() {
                return Err(error);
            }
        }
        Command::Links(args) => {
            let retrieval: RetrievalCollection = read_json(&args.retrieval)?;
            let count = actions
                .fetch_retrieval_links(dispatch, &args.token, &retrieval)
                .await?;
            tracing::info!("✅ Resolved {} links", count);
        }
        Command::Handoff(args) => {
            let state: SearchState = read_json(&args.state)?;
            let collection = state.collection_metadata(&state.focused_collection);
            let link = fetch_open_altimetry_handoff_url(
                &collection,
                &state.query.collection,
                args.projection.into(),
            )?;
            println!("{}", serde_json::to_string(&link)?);
        }
        Command::Mbr(args) => match mbr(&mbr_spatial(args))? {
            Some(rectangle) => println!("{}", serde_json::to_string(&rectangle)?),
            None => {
                return Err(SearchError::ValidationError {
                    message: "One of --polygon, --bounding-box, --point or --circle is required"
                        .to_string(),
                })
            }
        },
    }

    Ok(())
}

fn exit_code(error: &SearchError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting earthdata-search CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match load_config(cli.config.as_deref(), cli.environment.as_deref())
        .and_then(|config| config.validate().map(|_| config))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let dispatch = ActionLog::new();
    let outcome = run(&cli.command, config, &dispatch).await;

    // Actions are printed even when the command failed part way through
    for action in dispatch.take() {
        print_json(&action)?;
    }

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let code = exit_code(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}
