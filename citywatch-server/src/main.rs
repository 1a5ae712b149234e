//! citywatch-server binary

use citywatch_server::{Config, Server, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenv::dotenv();

    let config = Config::from_env()?;

    // Production logs are always structured
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json || config.is_production()),
        config.log_dir.as_deref(),
    );

    tracing::info!(
        "Starting citywatch-server (env: {}, port: {})",
        config.environment,
        config.http_port
    );

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
