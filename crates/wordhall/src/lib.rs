//! # Wordhall Server - Main Entry Point
//!
//! A realm-scoped broadcast hub that hosts timed word-guessing games over
//! WebSocket. This entry point handles CLI parsing, configuration loading,
//! and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! wordhall
//!
//! # Specify custom configuration
//! wordhall --config production.toml
//!
//! # Override specific settings
//! wordhall --bind 0.0.0.0:8080 --word-source https://words.example.com --log-level debug
//!
//! # JSON logging for production
//! wordhall --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default:
//! `config.toml`). If the file doesn't exist, a default configuration will
//! be created. The connection-token secret comes from `auth.secret_key` or
//! the `SECRET_KEY` environment variable.
//!
//! ## Signal Handling
//!
//! The server shuts down gracefully on SIGINT (Ctrl+C) and, on Unix
//! systems, SIGTERM.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the wordhall server.
///
/// Handles the complete application lifecycle:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
/// 5. Error handling and cleanup
///
/// Note: this function is called from an async context (main with
/// `#[tokio::main]`), so it should NOT have `#[tokio::main]` itself.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments first
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    // Create and run application
    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{AuthSettings, LoggingSettings, ServerSettings, WordSourceSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.server.send_buffer_size, 256);
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn test_config_validation() {
        let mut config = AppConfig::default();

        // Test invalid bind address
        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());

        // Test invalid log level
        config.server.bind_address = "127.0.0.1:8080".to_string();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        // Test empty word source
        config.logging.level = "info".to_string();
        config.word_source.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hub_config_requires_secret() {
        let mut config = AppConfig::default();
        config.auth.secret_key = None;
        if std::env::var("SECRET_KEY").is_err() {
            assert!(config.to_hub_config().is_err());
        }

        config.auth.secret_key = Some("a-very-secret-key".to_string());
        let hub_config = config.to_hub_config().expect("secret is configured");
        assert_eq!(hub_config.secret_key, "a-very-secret-key");
        assert_eq!(hub_config.bind_address.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cli_parsing() {
        // Test CLI argument structure
        let args = CliArgs {
            config_path: PathBuf::from("test.toml"),
            bind_address: Some("127.0.0.1:9000".to_string()),
            word_source_url: Some("http://words.local".to_string()),
            log_level: Some("debug".to_string()),
            json_logs: true,
        };

        assert_eq!(args.config_path, PathBuf::from("test.toml"));
        assert_eq!(args.bind_address, Some("127.0.0.1:9000".to_string()));
        assert_eq!(args.word_source_url, Some("http://words.local".to_string()));
        assert_eq!(args.log_level, Some("debug".to_string()));
        assert!(args.json_logs);
    }

    #[tokio::test]
    async fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");

        // First load writes the default file.
        let created = AppConfig::load_from_file(&path)
            .await
            .expect("creates default config");
        assert!(path.exists());

        // Second load reads it back identically.
        let loaded = AppConfig::load_from_file(&path)
            .await
            .expect("reads config back");
        assert_eq!(created.server.bind_address, loaded.server.bind_address);
        assert_eq!(created.word_source.base_url, loaded.word_source.base_url);
        assert_eq!(created.logging.level, loaded.logging.level);
    }
}
