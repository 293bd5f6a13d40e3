use std::sync::{Arc, Mutex};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::infrastructure::bootstrap::{build_state, spawn_session_sweeper};
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::interfaces::http::{start_server, LogEntry};

pub async fn run() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut config = AppConfig::load().map_err(|err| {
        error!(error = %err, "Failed to load configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;
    ConfigService::new().resolve_api_key(&mut config.llm);

    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));
    let state = build_state(&config, logs.clone())
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    let state = Arc::new(state);
    if config.workflow.session_idle_ttl().is_some() {
        let _sweeper = spawn_session_sweeper(
            state.workflow.clone(),
            config.workflow.session_sweep_interval(),
            logs.clone(),
        );
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting HTTP API"
    );
    start_server(state, logs, &config.server)?.await
}
