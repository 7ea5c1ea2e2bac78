use std::process::ExitCode;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use arcade_host::config::HostConfig;
use arcade_host::error::HostError;
use arcade_host::registry::GameRegistry;
use arcade_host::session::{SessionBroadcast, SessionCommand, spawn_session};

#[tokio::main]
async fn main() -> ExitCode {
    let config = HostConfig::load();
    let json_logs = config.as_ref().is_ok_and(|c| c.json_logs);
    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match config {
        Ok(config) => match run(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Arcade host failed");
                ExitCode::FAILURE
            },
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to load host configuration");
            ExitCode::FAILURE
        },
    }
}

/// Run one local bot match to completion and log its result record.
async fn run(config: HostConfig) -> Result<(), HostError> {
    let registry = GameRegistry::new();
    let session_config = arcade_host::bot_match(&config)?;
    let game_id = session_config.game_id;
    tracing::info!(game = %game_id, bots = session_config.players.len(), "Arcade host starting");

    let mut session = spawn_session(&registry, session_config)?;
    session.send(SessionCommand::Start);

    loop {
        match session.broadcasts.recv().await {
            Ok(SessionBroadcast::Snapshot(_)) => {},
            Ok(SessionBroadcast::Ended(result)) => {
                let record =
                    serde_json::to_string(&result).map_err(|e| HostError::Encode(e.to_string()))?;
                tracing::info!(game = %game_id, result = %record, "Match result");
                session.send(SessionCommand::Stop);
            },
            Ok(SessionBroadcast::Stopped) | Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(n)) => {
                tracing::debug!(skipped = n, "Result watcher lagged behind snapshots");
            },
        }
    }

    if let Err(e) = session.task.await {
        tracing::warn!(error = %e, "Session task did not shut down cleanly");
    }
    Ok(())
}
