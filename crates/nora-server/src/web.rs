//! HTTP + WebSocket API server.
//!
//! Accept threads forward every listener into one channel; a single loop
//! thread waits on it and parses, routes and answers each request before
//! taking the next one. WebSocket
//! sessions upgraded from `/ws` are handed to their own thread because the
//! upgraded stream only supports blocking reads.

#![allow(missing_docs)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiErrorKind, ServerError};
use crate::files::FileStore;
use crate::paths::DataRoot;
use crate::project::ProjectStore;

pub mod frontend;
mod handlers;
pub mod router;
mod ws;

pub use router::{Route, Router};
pub use ws::{WS_PATH, WS_REPLY};

/// Stores shared by every handler.
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub projects: ProjectStore,
    pub files: FileStore,
}

impl ApiContext {
    #[must_use]
    pub fn new(root: DataRoot) -> Self {
        Self {
            projects: ProjectStore::new(root.clone()),
            files: FileStore::new(root),
        }
    }
}

/// A parsed request, detached from the connection it arrived on.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            method,
            path: path.to_string(),
            query: parse_query(query),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a query parameter; empty values count as missing.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    fn new(status: u16, content_type: Option<&str>, body: Vec<u8>) -> Self {
        let mut headers = vec![("Access-Control-Allow-Origin", "*".to_string())];
        if let Some(content_type) = content_type {
            headers.push(("Content-Type", content_type.to_string()));
        }
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status, Some("text/plain"), body.as_bytes().to_vec())
    }

    pub fn json(status: u16, value: &impl Serialize) -> Self {
        match serde_json::to_vec_pretty(value) {
            Ok(body) => Self::new(status, Some("application/json"), body),
            Err(err) => {
                warn!(error = %err, "response serialization failed");
                Self::error(&ApiError::new(
                    ApiErrorKind::Internal,
                    "Failed to serialize response",
                ))
            }
        }
    }

    #[must_use]
    pub fn error(err: &ApiError) -> Self {
        let status = err.status_code();
        let body = serde_json::json!({ "status": status, "error": err.message() });
        Self::new(
            status,
            Some("application/json"),
            body.to_string().into_bytes(),
        )
    }

    /// Fixed CORS answer to any `OPTIONS` request.
    #[must_use]
    pub fn preflight() -> Self {
        let mut response = Self::new(204, None, Vec::new());
        response.headers.extend([
            ("Access-Control-Allow-Methods", "GET, POST, OPTIONS".to_string()),
            (
                "Access-Control-Allow-Headers",
                "Content-Type, Authorization".to_string(),
            ),
            ("Access-Control-Max-Age", "86400".to_string()),
        ]);
        response
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let mut response = Response::from_data(self.body).with_status_code(StatusCode(self.status));
        for (name, value) in self.headers {
            if let Ok(header) = Header::from_bytes(name, value) {
                response.add_header(header);
            }
        }
        response
    }
}

pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

pub struct ApiServer {
    api: Server,
    ws: Option<Server>,
    router: Router,
    context: ApiContext,
    poll_interval: Duration,
}

impl ApiServer {
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let api = bind_listener(&config.api_listen())?;
        let ws = config.ws_listen().map(|listen| bind_listener(&listen)).transpose()?;
        Ok(Self {
            api,
            ws,
            router: Router::api()?,
            context: ApiContext::new(DataRoot::new(&config.data_root)),
            poll_interval: config.poll_interval,
        })
    }

    #[must_use]
    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.api.server_addr().to_ip()
    }

    /// Address of the WebSocket listener; the API address when it is shared.
    #[must_use]
    pub fn ws_addr(&self) -> Option<SocketAddr> {
        match &self.ws {
            Some(server) => server.server_addr().to_ip(),
            None => self.api_addr(),
        }
    }

    /// Polls until `running` is cleared; the flag is checked once per iteration.
    ///
    /// Each listener gets an accept thread that only forwards requests into
    /// one channel. Parsing, routing and answering stay on this thread.
    pub fn run(&self, running: &AtomicBool) {
        info!(
            api = ?self.api_addr(),
            ws = ?self.ws_addr(),
            "api server started"
        );
        let poll_interval = self.poll_interval;
        thread::scope(|scope| {
            let (sender, receiver) = crossbeam_channel::unbounded();
            for (name, server) in self.listeners() {
                let sender = sender.clone();
                let spawned = thread::Builder::new()
                    .name(format!("nora-accept-{name}"))
                    .spawn_scoped(scope, move || {
                        forward_requests(server, &sender, running, poll_interval);
                    });
                if let Err(err) = spawned {
                    warn!(listener = name, error = %err, "failed to start accept thread");
                }
            }
            drop(sender);
            while running.load(Ordering::SeqCst) {
                if self.poll_once(&receiver).is_none() {
                    break;
                }
            }
        });
        info!("api server stopped");
    }

    fn listeners(&self) -> Vec<(&'static str, &Server)> {
        let mut listeners = vec![("api", &self.api)];
        if let Some(ws) = &self.ws {
            listeners.push(("ws", ws));
        }
        listeners
    }

    /// One wait across every listener, then answers everything already queued.
    ///
    /// Returns `None` once every accept thread has gone away.
    fn poll_once(&self, receiver: &Receiver<Request>) -> Option<usize> {
        let first = match receiver.recv_timeout(self.poll_interval) {
            Ok(request) => request,
            Err(RecvTimeoutError::Timeout) => return Some(0),
            Err(RecvTimeoutError::Disconnected) => return None,
        };
        self.handle(first);
        let mut handled = 1;
        for request in receiver.try_iter() {
            self.handle(request);
            handled += 1;
        }
        Some(handled)
    }

    fn handle(&self, mut request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!(method = method.as_str(), url = %url, "received request");

        let path = url.split_once('?').map_or(url.as_str(), |(path, _)| path);
        if method != Method::Options && path == WS_PATH {
            ws::upgrade(request);
            return;
        }

        let mut body = Vec::new();
        if let Err(err) = request.as_reader().read_to_end(&mut body) {
            debug!(error = %err, "request body unreadable");
            let response = ApiResponse::error(&ApiError::invalid("Invalid body"));
            let _ = request.respond(response.into_response());
            return;
        }
        let api_request = ApiRequest::new(method, &url).with_body(body);
        let response = self.router.dispatch(&self.context, &api_request);
        if let Err(err) = request.respond(response.into_response()) {
            debug!(error = %err, "client went away before the response");
        }
    }
}

fn forward_requests(
    server: &Server,
    sender: &Sender<Request>,
    running: &AtomicBool,
    poll_interval: Duration,
) {
    while running.load(Ordering::SeqCst) {
        match server.recv_timeout(poll_interval) {
            Ok(Some(request)) => {
                if sender.send(request).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "listener receive failed"),
        }
    }
}

fn bind_listener(listen: &str) -> Result<Server, ServerError> {
    Server::http(listen).map_err(|err| ServerError::Bind(format!("{listen}: {err}").into()))
}

pub struct ApiHandle {
    handle: thread::JoinHandle<()>,
    running: Arc<AtomicBool>,
    pub api_addr: Option<SocketAddr>,
    pub ws_addr: Option<SocketAddr>,
}

impl ApiHandle {
    /// Clears the running flag and waits for the loop to finish its iteration.
    pub fn shutdown(self) {
        self.running.store(false, Ordering::SeqCst);
        if self.handle.join().is_err() {
            warn!("api server thread panicked");
        }
    }
}

/// Binds on the calling thread, then runs the loop on a dedicated one.
pub fn spawn_api_server(
    config: &ServerConfig,
    running: Arc<AtomicBool>,
) -> Result<ApiHandle, ServerError> {
    let server = ApiServer::bind(config)?;
    let api_addr = server.api_addr();
    let ws_addr = server.ws_addr();
    let flag = running.clone();
    let handle = thread::Builder::new()
        .name("nora-api".into())
        .spawn(move || server.run(&flag))
        .map_err(|err| ServerError::Io(format!("api thread: {err}").into()))?;
    Ok(ApiHandle {
        handle,
        running,
        api_addr,
        ws_addr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parameters_are_decoded() {
        let request = ApiRequest::new(
            Method::Get,
            "/files?projectName=my%20demo&path=scripts%2Fa+b.txt&empty=",
        );
        assert_eq!(request.path, "/files");
        assert_eq!(request.query_param("projectName"), Some("my demo"));
        assert_eq!(request.query_param("path"), Some("scripts/a b.txt"));
        assert_eq!(request.query_param("empty"), None);
        assert_eq!(request.query_param("absent"), None);
    }

    #[test]
    fn error_body_carries_status_and_message() {
        let response = ApiResponse::error(&ApiError::not_found("Not found"));
        assert_eq!(response.status, 404);
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        let body: serde_json::Value =
            serde_json::from_slice(&response.body).expect("error body is json");
        assert_eq!(body, serde_json::json!({ "status": 404, "error": "Not found" }));
    }

    #[test]
    fn preflight_lists_cors_headers() {
        let response = ApiResponse::preflight();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
        assert_eq!(
            response.header("Access-Control-Allow-Methods"),
            Some("GET, POST, OPTIONS")
        );
        assert_eq!(
            response.header("Access-Control-Allow-Headers"),
            Some("Content-Type, Authorization")
        );
        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    }
}
