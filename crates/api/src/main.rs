//! Agenda Pro server binary.

use std::sync::Arc;

use agendapro_domain::{AgendaError, Result};
use agendapro_server::{router, AppContext};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "environment loaded from .env"),
        Err(_) => debug!("no .env file found"),
    }

    let config = agendapro_infra::config::load()?;
    let bind_addr = config.server.bind_addr.clone();

    let ctx = Arc::new(AppContext::new_with_config(config).await?);
    let app = router(ctx.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AgendaError::Config(format!("cannot bind {bind_addr}: {err}")))?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AgendaError::Internal(format!("server error: {err}")))?;

    ctx.shutdown().await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}

/// Resolves on ctrl-c or SIGTERM so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("ctrl-c received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }
}
