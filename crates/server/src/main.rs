mod bootstrap;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use trrbot_core::config::{AppConfig, LoadOptions, LogFormat};

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing or malformed tokens stop the process here with a non-zero exit.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    tracing::info!(
        event_name = "system.server.started",
        mention_name = %app.config.bot.mention_name,
        "trrbot started"
    );

    let outcome = tokio::select! {
        result = app.slack_runner.start() => result.map_err(anyhow::Error::from),
        signal = wait_for_shutdown() => signal,
    };

    tracing::info!(event_name = "system.server.stopping", "closing database pool");
    app.db_pool.close().await;

    if let Err(error) = &outcome {
        tracing::error!(
            event_name = "system.server.failed",
            error = %error,
            "trrbot stopped with an error"
        );
    }
    outcome
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!(event_name = "system.server.signal_received", "shutdown signal received");
    Ok(())
}
