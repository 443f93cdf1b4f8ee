use anyhow::{Context, Result};

use converter::config::Config;
use converter::worker::Worker;

/// Register with a coordinator and serve the intake until a shutdown signal
pub async fn serve(config: Config) -> Result<()> {
    let bind_address = config.server.bind_address;
    let max_jobs = config.worker.max_concurrent_jobs;

    let worker = match Worker::register(config).await {
        Ok(worker) => worker,
        Err(e) => {
            tracing::error!(
                category = e.category().as_str(),
                fatal = e.is_fatal(),
                error = %e,
                "Worker startup failed"
            );
            return Err(e).context("Failed to start converter worker");
        }
    };

    println!("Converter Worker");
    println!("================");
    println!("  Coordinator: {}", worker.session().base_url());
    println!("  Max Concurrent Jobs: {max_jobs}");
    println!();
    println!("API Endpoints:");
    println!("  POST /api/v1/processing - Submit a conversion job");
    println!("  GET  /api/v1/health     - Health check");
    println!("  GET  /metrics           - Prometheus metrics endpoint");
    println!();
    println!("Worker listening on http://{bind_address}");
    println!("Press Ctrl+C to stop.\n");

    if let Err(e) = worker.serve(shutdown_signal()).await {
        tracing::error!(category = e.category().as_str(), error = %e, "Intake server failed");
        return Err(e.into());
    }

    println!("Converter worker stopped.");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to wait for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
