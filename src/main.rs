use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whisper_relay::config::{config_search_paths, API_KEY_ENV};
use whisper_relay::{build_router, AppState, RelayConfig, SharedLogger};

#[derive(Parser)]
#[command(
    name = "whisper-relay",
    about = "Relay for chat, translation and Whisper transcription that keeps the API key server-side",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT and config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream API root (overrides OPENAI_BASE_URL and config)
    #[arg(long)]
    base_url: Option<String>,

    /// Append request logs as JSONL to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whisper_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = RelayConfig::find_and_load(cli.config.as_deref())?;
    config.apply_env()?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let logger = match cli.log_file {
        Some(ref path) => SharedLogger::with_file(path)?,
        None => SharedLogger::in_memory(),
    };

    info!("whisper-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:   {}", config.base_url);
    info!("  Translate:  {}", config.models.translate);
    info!("  Transcribe: {}", config.models.transcribe);
    info!("  Port:       {}", config.port);

    if !config.has_api_key() {
        logger.warn(
            "startup",
            format!(
                "{} is not set. Set it in .env or the environment; upstream calls will be rejected",
                API_KEY_ENV
            ),
        );
    }

    // No timeout: a request lives as long as its upstream call.
    let client = reqwest::Client::builder().build()?;

    let port = config.port;
    let state = Arc::new(AppState {
        config,
        client,
        logger: logger.clone(),
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    logger.info("startup", format!("Listening on http://{}", bind_addr));

    axum::serve(listener, app).await?;

    Ok(())
}
