//! Argument blocks and process bootstrap shared by all Resupply Planner
//! binaries: logging setup, database connection settings, and the shutdown
//! signal future.

mod config;
mod logging;

pub use config::DatabaseArgs;
pub use logging::{init_logging, LogArgs, LogFormat, LogLevel};

/// Completes once the process receives SIGINT or SIGTERM.
///
/// Long-running binaries poll this between units of work so an in-flight
/// frame or batch is always drained before exit.
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate.recv() => {}
            }
        }
        Err(error) => {
            tracing::warn!(%error, "failed to install SIGTERM handler");
            let _ = ctrl_c.await;
        }
    }
    tracing::info!("received shutdown signal");
}
