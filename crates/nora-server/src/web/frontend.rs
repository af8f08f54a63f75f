//! Static server for the pre-built web frontend and its discovery file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::config::FrontendConfig;
use crate::error::ServerError;

/// Writes the two-line file telling the frontend where the backend listens.
pub fn write_discovery_file(path: &Path, api_url: &str, ws_url: &str) -> Result<(), ServerError> {
    std::fs::write(path, format!("{api_url}\n{ws_url}\n"))
        .map_err(|err| ServerError::Discovery(format!("{}: {err}", path.display()).into()))
}

pub struct FrontendServer {
    server: Server,
    dist_dir: PathBuf,
    poll_interval: Duration,
}

impl FrontendServer {
    pub fn bind(config: &FrontendConfig, poll_interval: Duration) -> Result<Self, ServerError> {
        let listen = config.listen();
        let server = Server::http(&listen)
            .map_err(|err| ServerError::Bind(format!("{listen}: {err}").into()))?;
        Ok(Self {
            server,
            dist_dir: config.dist_dir.clone(),
            poll_interval,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn run(&self, running: &AtomicBool) {
        info!(addr = ?self.local_addr(), dist = %self.dist_dir.display(), "frontend server started");
        while running.load(Ordering::SeqCst) {
            match self.server.recv_timeout(self.poll_interval) {
                Ok(Some(request)) => self.serve(request),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "frontend receive failed"),
            }
        }
        info!("frontend server stopped");
    }

    fn serve(&self, request: Request) {
        let url = request.url().to_string();
        if !matches!(request.method(), Method::Get | Method::Head) {
            let _ = request.respond(Response::from_string("method not allowed").with_status_code(StatusCode(405)));
            return;
        }
        let path = url.split_once('?').map_or(url.as_str(), |(path, _)| path);
        let opened = resolve_asset(&self.dist_dir, path)
            .and_then(|asset| File::open(&asset).ok().map(|file| (asset, file)));
        let Some((asset, file)) = opened else {
            debug!(url = %url, "frontend asset not found");
            let _ = request.respond(Response::from_string("not found").with_status_code(StatusCode(404)));
            return;
        };
        let mut response = Response::from_file(file);
        if let Ok(header) = Header::from_bytes("Content-Type", content_type(&asset)) {
            response.add_header(header);
        }
        let _ = request.respond(response);
    }
}

/// Maps a URL path onto a file inside `dist_dir`; `/` and folders serve `index.html`.
fn resolve_asset(dist_dir: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url_path).ok()?;
    let relative = decoded.trim_start_matches('/');
    let mut requested = dist_dir.join(relative);
    if requested.is_dir() {
        requested = requested.join("index.html");
    }
    let root = dist_dir.canonicalize().ok()?;
    let requested = requested.canonicalize().ok()?;
    if !requested.starts_with(&root) || !requested.is_file() {
        return None;
    }
    Some(requested)
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("json" | "map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
