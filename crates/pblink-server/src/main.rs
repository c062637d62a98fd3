mod api;
mod config;

use anyhow::Context;
use api::ServerState;
use config::ServerConfig;
use pblink_core::{LinkWorkflow, LinkerConfig};
use pblink_storage::{Storage, paths};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pblink_core=debug,pblink_server=debug".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server_config = ServerConfig::load()?;
    init_tracing(server_config.log_json);

    tracing::info!("Starting pblink server");

    let db_path = match &server_config.db_path {
        Some(path) => path.clone(),
        None => paths::default_db_path()?,
    };
    let storage = Storage::new(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let linker_config = LinkerConfig::load()?;
    let launcher = Arc::new(linker_config.node.launcher());
    let workflow = LinkWorkflow::new(launcher, linker_config)?;
    tracing::info!(
        steps = workflow.plan().steps.len(),
        target_domain = %workflow.config().target_domain,
        "Step plan loaded"
    );

    let state = Arc::new(ServerState {
        workflow,
        storage,
        run_timeout: Duration::from_secs(server_config.run_timeout_secs),
        keep_sessions: server_config.keep_sessions,
        keep_runs: server_config.keep_runs,
    });
    let app = api::router(state);

    let addr = format!("{}:{}", server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("pblink running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Failed to start server")
}
