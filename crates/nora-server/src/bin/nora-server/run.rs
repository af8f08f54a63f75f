//! Startup: config, listeners, frontend thread, signal watcher, API loop.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use nora_server::config::{public_host, DEFAULT_DISCOVERY_FILE, DEFAULT_FRONTEND_PORT};
use nora_server::web::frontend::{write_discovery_file, FrontendServer};
use nora_server::{ApiServer, FrontendConfig, ServerConfig};
use smol_str::SmolStr;
use tracing::{info, warn};

use crate::cli::Cli;

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = build_config(cli)?;
    std::fs::create_dir_all(&config.data_root).with_context(|| {
        format!("failed to create data root {}", config.data_root.display())
    })?;
    info!(data_root = %config.data_root.display(), "using data root");

    let server = ApiServer::bind(&config)?;
    let running = Arc::new(AtomicBool::new(true));
    spawn_signal_watcher(running.clone())?;

    let frontend = match &config.frontend {
        Some(frontend) => Some(start_frontend(frontend, &config, &server, running.clone())?),
        None => None,
    };

    server.run(&running);

    if let Some(handle) = frontend {
        if handle.join().is_err() {
            warn!("frontend thread panicked");
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.host = SmolStr::new(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ws_port) = cli.ws_port {
        config.ws_port = Some(ws_port);
    }
    if let Some(data_root) = &cli.data_root {
        config.data_root.clone_from(data_root);
    }
    if let Some(poll_ms) = cli.poll_ms {
        config.poll_interval = Duration::from_millis(poll_ms);
    }
    if let Some(dist_dir) = &cli.frontend_dir {
        let host = config.host.clone();
        let frontend = config.frontend.get_or_insert_with(|| FrontendConfig {
            host,
            port: DEFAULT_FRONTEND_PORT,
            dist_dir: dist_dir.clone(),
            discovery_file: SmolStr::new(DEFAULT_DISCOVERY_FILE),
        });
        frontend.dist_dir.clone_from(dist_dir);
    }
    if let (Some(port), Some(frontend)) = (cli.frontend_port, config.frontend.as_mut()) {
        frontend.port = port;
    }
    config.validate()?;
    Ok(config)
}

fn start_frontend(
    frontend: &FrontendConfig,
    config: &ServerConfig,
    server: &ApiServer,
    running: Arc<AtomicBool>,
) -> anyhow::Result<thread::JoinHandle<()>> {
    let host = public_host(&config.host);
    let api_url = backend_url("http", host, server.api_addr(), config.port);
    let ws_url = backend_url("ws", host, server.ws_addr(), config.ws_port.unwrap_or(config.port));
    write_discovery_file(&frontend.discovery_path(), &api_url, &ws_url)?;
    info!(api = %api_url, ws = %ws_url, "wrote backend discovery file");

    let static_server = FrontendServer::bind(frontend, config.poll_interval)?;
    thread::Builder::new()
        .name("nora-frontend".into())
        .spawn(move || static_server.run(&running))
        .context("failed to spawn frontend thread")
}

fn backend_url(scheme: &str, host: &str, bound: Option<SocketAddr>, fallback: u16) -> String {
    let port = bound.map_or(fallback, |addr| addr.port());
    format!("{scheme}://{host}:{port}")
}

/// Clears `running` on Ctrl-C or SIGTERM.
fn spawn_signal_watcher(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("signal runtime init failed")?;
    thread::Builder::new()
        .name("nora-signals".into())
        .spawn(move || {
            runtime.block_on(wait_for_shutdown());
            info!("shutdown requested");
            running.store(false, Ordering::SeqCst);
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
