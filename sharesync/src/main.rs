use std::process::ExitCode;

use anyhow::Context;
use sharesync::config::SyncConfig;
use sharesync::{MetadataStore, SyncEngine};
use sharesync_core::GraphClient;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    for arg in args.into_iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sharesync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    if parse_cli_mode(std::env::args())? == CliMode::Help {
        println!("Usage: sharesync [--help]");
        println!("  Mirrors the shared links listed in <workspace>/.metadata.json");
        println!("  GPTSCRIPT_GRAPH_MICROSOFT_COM_BEARER_TOKEN  Graph bearer token");
        println!("  GPTSCRIPT_WORKSPACE_DIR                     workspace (default: cwd)");
        return Ok(());
    }

    let config = SyncConfig::from_env()?;
    let store = MetadataStore::new(&config.metadata_path);
    let mut state = store
        .load()
        .await
        .with_context(|| format!("failed to load {}", config.metadata_path.display()))?;
    let output_dir = config.output_dir(&state.input);

    let token = config.token.clone().unwrap_or_else(|| {
        warn!("no bearer token configured; remote requests will be unauthenticated");
        String::new()
    });
    let client = match &config.graph_base_url {
        Some(base_url) => GraphClient::with_base_url(base_url, token)?,
        None => GraphClient::new(token)?,
    };

    let engine = SyncEngine::new(client, store, output_dir);
    engine.run(&mut state).await.context("sync failed")?;
    Ok(())
}
