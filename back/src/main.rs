use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use back::{
    clock::{Clock, SystemClock},
    config::Config,
    service::TaskService,
    store::MemoryStore,
    sweeper::OverdueSweeper,
    AppState,
};
use clap::Parser;
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::parse();

    let store = Arc::new(MemoryStore::load(&config.data_file)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel = CancellationToken::new();

    let sweeper = OverdueSweeper::new(store.clone(), clock.clone())
        .spawn(config.sweep_interval(), cancel.clone());
    let flusher = spawn_flusher(
        store.clone(),
        config.data_file.clone(),
        config.flush_interval(),
        cancel.clone(),
    );

    let state = Arc::new(AppState::new(TaskService::new(store.clone(), clock)));
    let app = back::app(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    let addr = SocketAddr::from(([0; 4], config.port));
    tracing::info!(%addr, tls = config.tls().is_some(), "listening");

    let served = serve(&config, addr, handle, app).await;

    cancel.cancel();
    for task in [sweeper, flusher] {
        if let Err(err) = task.await {
            tracing::error!("background task failed: {:?}", err);
        }
    }

    finish(served, store, config.data_file.clone()).await
}

async fn serve(
    config: &Config,
    addr: SocketAddr,
    handle: Handle,
    app: Router,
) -> eyre::Result<()> {
    match config.tls() {
        Some((cert, key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key).await?;
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}

/// Writes the final snapshot, then reports how serving ended.
async fn finish(
    served: eyre::Result<()>,
    store: Arc<MemoryStore>,
    path: PathBuf,
) -> eyre::Result<()> {
    if let Err(err) = &served {
        tracing::error!("server stopped: {:?}", err);
    }

    persist(store, path).await?;
    tracing::info!("stored data, shutting down");

    served
}

/// Runs the blocking snapshot write off the async workers.
async fn persist(store: Arc<MemoryStore>, path: PathBuf) -> eyre::Result<()> {
    tokio::task::spawn_blocking(move || store.persist(&path)).await?
}

fn spawn_flusher(
    store: Arc<MemoryStore>,
    path: PathBuf,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = time::sleep(every) => {}
            }

            if let Err(err) = persist(store.clone(), path.clone()).await {
                tracing::error!("Failed to store data: {:?}", err);
            }
        }
    })
}

async fn shutdown_on_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {:?}", err);
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
                tracing::error!("Failed to listen for SIGTERM: {:?}", err);
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

    tracing::info!("shutdown requested");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
