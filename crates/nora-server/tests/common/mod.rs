#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nora_server::{spawn_api_server, ApiHandle, ServerConfig};
use serde_json::{json, Value};
use smol_str::SmolStr;

pub struct TestServer {
    pub base: String,
    pub ws_url: String,
    pub data_root: PathBuf,
    handle: Option<ApiHandle>,
}

impl TestServer {
    /// Binds ephemeral ports; `separate_ws` adds a dedicated WebSocket listener.
    pub fn start(name: &str, separate_ws: bool) -> Self {
        Self::start_with_poll(name, separate_ws, Duration::from_millis(20))
    }

    pub fn start_with_poll(name: &str, separate_ws: bool, poll_interval: Duration) -> Self {
        let data_root = std::env::temp_dir().join(format!(
            "nora-server-it-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&data_root);
        std::fs::create_dir_all(&data_root).expect("create data root");

        let config = ServerConfig {
            host: SmolStr::new("127.0.0.1"),
            port: 0,
            ws_port: separate_ws.then_some(0),
            poll_interval,
            data_root: data_root.clone(),
            frontend: None,
        };
        let handle = spawn_api_server(&config, Arc::new(AtomicBool::new(true)))
            .expect("start api server");
        let api = handle.api_addr.expect("api address");
        let ws = handle.ws_addr.expect("ws address");
        let server = Self {
            base: format!("http://{api}"),
            ws_url: format!("ws://{ws}/ws"),
            data_root,
            handle: Some(handle),
        };
        server.wait_until_ready();
        server
    }

    fn wait_until_ready(&self) {
        for _ in 0..100 {
            if ureq::get(&format!("{}/", self.base)).call().is_ok() {
                return;
            }
            thread::sleep(Duration::from_millis(25));
        }
        panic!("api server did not become reachable at {}", self.base);
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
        }
        let _ = std::fs::remove_dir_all(&self.data_root);
    }
}

pub fn response_parts(result: Result<ureq::Response, ureq::Error>) -> (u16, String) {
    match result {
        Ok(response) => {
            let status = response.status();
            (status, response.into_string().expect("read success body"))
        }
        Err(ureq::Error::Status(status, response)) => {
            (status, response.into_string().expect("read error body"))
        }
        Err(err) => panic!("request failed: {err}"),
    }
}

pub fn get(url: &str) -> (u16, String) {
    response_parts(ureq::get(url).call())
}

pub fn post_raw(url: &str, body: &str) -> (u16, String) {
    response_parts(
        ureq::post(url)
            .set("Content-Type", "application/json")
            .send_string(body),
    )
}

pub fn post_json(url: &str, payload: &Value) -> (u16, String) {
    post_raw(url, &payload.to_string())
}

pub fn parse(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| json!({}))
}
