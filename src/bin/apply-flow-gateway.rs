use anyhow::Result;
use apply_flow::cache::token_cache::build_caches;
use apply_flow::server;
use apply_flow::server::token_routes::TokenRoutesState;
use apply_flow::sources::build_http_client;
use apply_flow::utils::config_loader;
use apply_flow::utils::logging;
use apply_flow::utils::logging::LogLevel;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "apply-flow.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL" , value_enum)]
    log_level: Option<LogLevel>,
    /// fetch every token once before serving
    #[arg(long, env = "WARM_UP", default_value_t = true, action = clap::ArgAction::Set)]
    warm_up: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, start logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level).await?;

    // -------------------------------
    // 2. Build one token cache per source
    // -------------------------------

    let client = build_http_client(&service_config.settings)?;
    let caches = build_caches(&service_config, &client);

    // -------------------------------
    // 3. Warm up caches, failures are retried on first request
    // -------------------------------

    if args.warm_up {
        for (id, cache) in &caches {
            if let Err(err) = cache.get_token().await {
                warn!(source = %id, "warm up failed: {}", err);
            }
        }
    }

    // -------------------------------
    // 4. Serve tokens, health and metrics
    // -------------------------------

    let tokens = TokenRoutesState::new(caches, service_config.default_token_source());
    info!("Service starting...");
    server::server::start(&service_config.settings, tokens).await
}
