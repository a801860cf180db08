//! pagerun server binary.
//!
//! Wires the environment-driven configuration into the execution core and the
//! keyword extractor, then serves the HTTP surface until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use pagerun_core::llm::KEYWORD_TEMPERATURE;
use pagerun_core::{Executor, KeywordExtractor, OpenAiClient, ServiceConfig};
use pagerun_server::{shutdown_signal, PagerunServer, ServerConfig};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "pagerun - run untrusted payloads in ephemeral browser sessions"
)]
struct Cli {
    #[clap(
        long,
        short,
        help = "Override the bind address from the environment, e.g. 127.0.0.1:4000"
    )]
    bind_addr: Option<String>,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let mut config = ServiceConfig::from_env()?;
    if let Some(addr) = cli.bind_addr {
        config.server.bind_addr = addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", addr, e))?;
    }
    log::info!(
        "Configuration loaded: bind {}, execution timeout {}ms",
        config.server.bind_addr,
        config.browser.timeout.as_millis()
    );

    let executor = Executor::new(&config.browser);

    let api_key = config.llm.api_key.clone().unwrap_or_else(|| {
        log::warn!("OPENAI_API_KEY is not set; /generate-keywords will fail until it is provided");
        String::new()
    });
    let llm = OpenAiClient::new(api_key, config.llm.model.clone())
        .with_api_base(config.llm.api_base.clone())
        .with_temperature(KEYWORD_TEMPERATURE);
    let keywords = KeywordExtractor::new(Arc::new(llm));

    let server_config = ServerConfig::default()
        .with_bind_addr(config.server.bind_addr)
        .with_auth_token(config.server.auth_token.clone());

    log::info!("Starting pagerun server on {}...", config.server.bind_addr);
    let server = PagerunServer::with_config(executor, keywords, server_config);
    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    log::info!("pagerun server shut down gracefully.");
    Ok(())
}
