//! Process entry point for the batching engine.

use batching::{Batching, JobRequest, JobType, PacedBatchProcessor, RunConfig};
use tracing_subscriber::EnvFilter;

/// Configuration file read at startup; override with `BATCHING_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("BATCHING_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match RunConfig::load(&config_path).await {
        Ok(config) => config,
        Err(batching::ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No config at {}, using defaults", config_path);
            RunConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    let engine = Batching::new(config, PacedBatchProcessor);
    if std::env::var("BATCHING_PREPROCESS").is_ok_and(|v| v == "1" || v == "true") {
        engine.set_preprocess(true);
    }

    engine.start().await?;

    // Demo: seed a few jobs so the first ticks have work
    if std::env::var("BATCHING_DEMO").is_ok() {
        for (account, amount) in [("acc-1", 10), ("acc-2", -4), ("acc-1", 7)] {
            let job = engine.take(
                JobRequest::new(JobType::BALANCE_UPDATE, "balance change")
                    .with_param("account", account)
                    .with_param("amount", amount),
            )?;
            tracing::info!("Queued demo job {}", job.id);
        }
        engine.take(
            JobRequest::new(JobType::UPDATE_USER_INFO, "rename")
                .with_param("display_name", serde_json::json!("Ada")),
        )?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C, shutting down");

    engine.shut_down().await?;
    Ok(())
}
