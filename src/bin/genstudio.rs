//! HTTP server for GenStudio - prompt-to-image relay.

use clap::Parser;
use genstudio::image::providers::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use genstudio::server::DEFAULT_STATIC_DIR;
use genstudio::{AppState, ArtifactStore, ImageProvider, PollinationsProvider};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "genstudio")]
#[command(about = "Relay text prompts to an image generation API and serve the results")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Directory generated images are written to
    #[arg(long, env = "GENSTUDIO_IMAGES_DIR", default_value = "images")]
    images_dir: PathBuf,

    /// Directory holding home.html and index.html
    #[arg(long, env = "GENSTUDIO_STATIC_DIR", default_value = DEFAULT_STATIC_DIR)]
    static_dir: PathBuf,

    /// Prompt endpoint of the image provider
    #[arg(long, env = "POLLINATIONS_URL", default_value = DEFAULT_BASE_URL)]
    provider_url: String,

    /// Provider request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Probe the provider once at startup
    #[arg(long)]
    check_provider: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal; anything else is worth a note once logging is up.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("failed to load .env: {e}"),
    }

    let provider = PollinationsProvider::builder()
        .base_url(&cli.provider_url)
        .timeout(Duration::from_secs(cli.timeout_secs))
        .build()?;

    if cli.check_provider {
        match provider.health_check().await {
            Ok(()) => tracing::info!(provider = provider.name(), "provider reachable"),
            Err(e) => tracing::warn!(provider = provider.name(), "provider check failed: {e}"),
        }
    }

    let store = ArtifactStore::open(&cli.images_dir)?;
    tracing::info!(
        images_dir = %store.images_dir().display(),
        static_dir = %cli.static_dir.display(),
        provider_url = %cli.provider_url,
        "starting genstudio v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::new(Arc::new(provider), Arc::new(store)).with_static_dir(cli.static_dir);

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    genstudio::serve(listener, state).await?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "genstudio=debug,tower_http=debug"
    } else {
        "genstudio=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
