//! knockgate service binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use knockgate::{
    ChannelRegistry, ChatTransport, CommandHandlers, RotationScheduler, Router, Server,
    TelegramTransport,
};
use knockgate_core::Config;
use knockgate_knockd::{KnockController, SystemctlRunner};
use knockgate_perms::PermissionEngine;
use knockgate_store::SqliteStore;

#[derive(Debug, Parser)]
#[command(name = "knockgate", about = "Chat-operated dynamic port knocking")]
struct Cli {
    /// Path to the JSON configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    });

    let store = Arc::new(
        SqliteStore::open(&config.database_path).with_context(|| {
            format!("opening database at {}", config.database_path.display())
        })?,
    );

    let engine = Arc::new(PermissionEngine::new(store.clone(), &config));
    engine.init().await?;
    engine.bootstrap_admins().await?;

    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(&config.bot_token));
    let channels = Arc::new(ChannelRegistry::new(store, transport.clone()));
    channels.init().await?;

    let controller = Arc::new(KnockController::new(SystemctlRunner, &config));
    let rotation = Arc::new(RotationScheduler::new(
        config.clone(),
        controller.clone(),
        transport.clone(),
    ));

    let handlers = CommandHandlers::new(
        config.clone(),
        engine.clone(),
        channels.clone(),
        controller,
        rotation.clone(),
    );
    let router = Router::new(engine, handlers);

    info!("knockgate starting");
    Server::new(transport, router, channels, rotation, config)
        .run()
        .await?;

    Ok(())
}
