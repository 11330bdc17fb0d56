//! Refdesk application binary - composition root.
//!
//! Ties together the Refdesk crates into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Run one-time chat initialization (backend + validation)
//! 4. Start the axum API server with the embedded chat page
//!
//! Initialization runs at most once. When it fails, the process still serves
//! HTTP so the browser can show the fatal notice, but every chat route stays
//! unavailable until a restart.

mod cli;

use clap::Parser;

use refdesk_api::AppState;
use refdesk_chat::{ChatService, StaticBackend};
use refdesk_core::config::RefdeskConfig;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = RefdeskConfig::load_or_default(&config_file);
    config.general.port = args.resolve_port(config.general.port);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Refdesk v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // One-time initialization.
    let backend = StaticBackend::new(config.knowledge.max_results, config.knowledge.min_score);
    let state = match ChatService::initialize(&config, Box::new(backend)) {
        Ok(service) => AppState::new(config, service),
        Err(e) => {
            // Keep serving so the browser can display the fatal notice; chat
            // stays unreachable until the process is restarted.
            tracing::error!(error = %e, "initialization failed");
            let notice = e.user_notice();
            AppState::failed(config, notice)
        }
    };

    refdesk_api::start_server(state).await?;

    Ok(())
}
