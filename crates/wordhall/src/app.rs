//! Main application logic and lifecycle management.
//!
//! This module contains the core `Application` struct that wires the word
//! game onto the realm hub, runs the server, and handles monitoring and
//! graceful shutdown.

use crate::{cli::CliArgs, config::AppConfig, logging::display_banner, signals};
use realm_hub::{HubHandle, HubServer, RealmHub};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use wordgame::{HttpWordSource, WordgameHandler};

/// The assembled wordhall server.
///
/// Construction wires the pieces together: an [`HttpWordSource`] feeding a
/// [`WordgameHandler`], the handler driving (and driven by) the
/// [`RealmHub`], and a [`HubServer`] front end feeding connections into the
/// hub. Running the application spawns the hub loop and the accept loop,
/// then waits for a shutdown signal.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// The hub actor, not yet spawned
    hub: RealmHub,
    /// Handle onto the hub's command queue
    handle: HubHandle,
    /// WebSocket front end
    server: HubServer,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, validates settings, and
    /// wires up the server components.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }
        if let Some(word_source_url) = args.word_source_url {
            config.word_source.base_url = word_source_url;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let hub_config = config.to_hub_config()?;
        let source = Arc::new(HttpWordSource::with_timeout(
            config.word_source.base_url.clone(),
            Duration::from_secs(config.word_source.request_timeout_secs),
        )?);

        // The handler broadcasts back through the hub it is plugged into,
        // so hand it the queue's sender before building the hub itself.
        let (handle, commands) = RealmHub::channel();
        let handler = Arc::new(WordgameHandler::new(source, Arc::new(handle.clone())));
        let hub = RealmHub::new(commands, handler);
        let server = HubServer::new(hub_config, handle.clone());

        info!(
            "📂 Config: {} | Word source: {}",
            args.config_path.display(),
            config.word_source.base_url
        );

        Ok(Self {
            config,
            hub,
            handle,
            server,
        })
    }

    /// Runs the application until a shutdown signal arrives, then shuts
    /// the pieces down in order: accept loop first, hub loop last.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let Application {
            config,
            hub,
            handle,
            server,
        } = self;

        info!("🌟 Starting Wordhall Server Application");
        log_configuration_summary(&config);

        let hub_task = tokio::spawn(hub.run());
        let server = Arc::new(server);
        let server_task: JoinHandle<()> = {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    error!("❌ Server error: {e}");
                }
            })
        };

        // Periodic health reporting straight off the hub's counters.
        let monitoring_task = {
            let handle = handle.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(60));
                ticker.tick().await; // the first tick fires immediately
                loop {
                    ticker.tick().await;
                    match handle.stats().await {
                        Some(stats) => info!(
                            "📊 System Health - {} realms | {} connections | {} broadcasts total",
                            stats.realms, stats.connections, stats.broadcasts
                        ),
                        None => break,
                    }
                }
            })
        };

        info!("✅ Wordhall Server is now running!");
        info!(
            "🎮 Ready to accept connections on {}",
            config.server.bind_address
        );
        info!("🔍 Health monitoring active - stats every 60 seconds");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        signals::wait_for_shutdown().await?;
        info!("🛑 Shutdown signal received, beginning graceful shutdown...");

        // Phase 1: stop taking new connections.
        monitoring_task.abort();
        server.shutdown();
        if tokio::time::timeout(Duration::from_secs(8), server_task)
            .await
            .is_err()
        {
            warn!("⏰ Server task did not stop within timeout; continuing cleanup");
        }

        // Phase 2: report final statistics while the hub still answers.
        if let Some(stats) = handle.stats().await {
            info!("📊 Final Statistics:");
            info!("  - Realms still open: {}", stats.realms);
            info!("  - Connections still open: {}", stats.connections);
            info!("  - Broadcasts delivered: {}", stats.broadcasts);
        }

        // Phase 3: stop the hub loop.
        hub_task.abort();

        info!("✅ Wordhall Server shutdown complete");
        info!("👋 Thank you for using Wordhall!");

        Ok(())
    }
}

/// Logs the configuration summary at startup.
fn log_configuration_summary(config: &AppConfig) {
    info!("📋 Configuration Summary:");
    info!("  🌐 Bind address: {}", config.server.bind_address);
    info!("  🧠 Word source: {}", config.word_source.base_url);
    info!(
        "  📦 Send buffer: {} frames per connection",
        config.server.send_buffer_size
    );
    info!(
        "  ⏱️ Pong timeout: {}s | write timeout: {}s",
        config.server.pong_timeout_secs, config.server.write_timeout_secs
    );
}
