use anyhow::Result;
use clap::Parser;
use facetgate::api::ApiServer;
use facetgate::{Config, HttpEngine, SearchGateway};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "facetgate-server")]
#[command(about = "Faceted search gateway for Elasticsearch-compatible engines")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "facetgate.toml", env = "FACETGATE_CONFIG")]
    config: String,

    /// Host to bind to (overrides server.bind_addr)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.bind_addr)
    #[arg(short, long)]
    port: Option<u16>,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.observability.log_level.clone()),
    );
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.observability.log_format.clone());

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// `host:port` from the arguments, falling back to the configured address.
fn bind_addr(args: &Args, configured: &str) -> String {
    let (host, port) = configured.rsplit_once(':').unwrap_or((configured, "8080"));
    let host = args.host.as_deref().unwrap_or(host);
    match args.port {
        Some(port) => format!("{}:{}", host, port),
        None => format!("{}:{}", host, port.parse::<u16>().unwrap_or(8080)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing has to be up before index specs are linted
    let path = Path::new(&args.config);
    let found = path.exists();
    let mut config = if found {
        Config::parse(path)?
    } else {
        Config::default()
    };
    init_tracing(&config);

    if found {
        tracing::info!("Config file: {}", args.config);
    } else {
        tracing::warn!("Config file {} not found, using defaults", args.config);
    }
    config.load_index_specs()?;
    tracing::info!(
        engine = %config.engine.uri,
        indices = config.indices.len(),
        "Starting facetgate"
    );

    let engine = Arc::new(HttpEngine::new(&config.engine)?);
    let gateway = Arc::new(SearchGateway::new(engine));

    let addr = bind_addr(&args, &config.server.bind_addr);
    let server = ApiServer::new(Arc::new(config), gateway);
    server.serve(&addr).await?;

    Ok(())
}
