//! Server configuration loading.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::ServerError;
use crate::paths::default_data_root;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WS_PORT: u16 = 8081;
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;
pub const DEFAULT_POLL_MS: u64 = 1000;
pub const DEFAULT_DISCOVERY_FILE: &str = "backend.txt";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: SmolStr,
    pub port: u16,
    /// `None` (or the API port) shares the API listener for `/ws`.
    pub ws_port: Option<u16>,
    pub poll_interval: Duration,
    pub data_root: PathBuf,
    pub frontend: Option<FrontendConfig>,
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub host: SmolStr,
    pub port: u16,
    pub dist_dir: PathBuf,
    pub discovery_file: SmolStr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: SmolStr::new(DEFAULT_HOST),
            port: DEFAULT_PORT,
            ws_port: Some(DEFAULT_WS_PORT),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            data_root: default_data_root(),
            frontend: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ServerError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ServerError> {
        let raw: NoraToml = toml::from_str(text)
            .map_err(|err| ServerError::InvalidConfig(format!("nora.toml: {err}").into()))?;
        raw.into_config()
    }

    /// Rejects values the listeners or the poll loop cannot work with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.host.trim().is_empty() {
            return Err(ServerError::InvalidConfig("server.host must not be empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ServerError::InvalidConfig(
                "server.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.data_root.as_os_str().is_empty() {
            return Err(ServerError::InvalidConfig(
                "storage.data_root must not be empty".into(),
            ));
        }
        if let Some(frontend) = &self.frontend {
            if frontend.host.trim().is_empty() {
                return Err(ServerError::InvalidConfig(
                    "frontend.host must not be empty".into(),
                ));
            }
            if frontend.discovery_file.contains(['/', '\\']) || frontend.discovery_file.is_empty()
            {
                return Err(ServerError::InvalidConfig(
                    format!("invalid frontend.discovery_file '{}'", frontend.discovery_file)
                        .into(),
                ));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn api_listen(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Separate WebSocket listener address, if one is configured.
    #[must_use]
    pub fn ws_listen(&self) -> Option<String> {
        match self.ws_port {
            Some(port) if port != self.port || port == 0 => {
                Some(format!("{}:{port}", self.host))
            }
            _ => None,
        }
    }
}

impl FrontendConfig {
    #[must_use]
    pub fn listen(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn discovery_path(&self) -> PathBuf {
        self.dist_dir.join(self.discovery_file.as_str())
    }
}

/// Host used in URLs handed to browsers.
#[must_use]
pub fn public_host(host: &str) -> &str {
    if host == "0.0.0.0" {
        "localhost"
    } else {
        host
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoraToml {
    server: Option<ServerSection>,
    storage: Option<StorageSection>,
    frontend: Option<FrontendSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    ws_port: Option<u16>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StorageSection {
    data_root: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrontendSection {
    enabled: Option<bool>,
    host: Option<String>,
    port: Option<u16>,
    dist_dir: Option<String>,
    discovery_file: Option<String>,
}

impl NoraToml {
    fn into_config(self) -> Result<ServerConfig, ServerError> {
        let defaults = ServerConfig::default();
        let server = self.server.unwrap_or(ServerSection {
            host: None,
            port: None,
            ws_port: None,
            poll_interval_ms: None,
        });
        let host = SmolStr::new(server.host.unwrap_or_else(|| DEFAULT_HOST.into()));

        let frontend = match self.frontend {
            Some(section) if section.enabled.unwrap_or(true) => {
                let Some(dist_dir) = section.dist_dir else {
                    return Err(ServerError::InvalidConfig(
                        "frontend.dist_dir required when the frontend is enabled".into(),
                    ));
                };
                Some(FrontendConfig {
                    host: section.host.map_or_else(|| host.clone(), SmolStr::new),
                    port: section.port.unwrap_or(DEFAULT_FRONTEND_PORT),
                    dist_dir: PathBuf::from(dist_dir),
                    discovery_file: SmolStr::new(
                        section
                            .discovery_file
                            .unwrap_or_else(|| DEFAULT_DISCOVERY_FILE.into()),
                    ),
                })
            }
            _ => None,
        };

        let config = ServerConfig {
            host,
            port: server.port.unwrap_or(defaults.port),
            ws_port: Some(server.ws_port.unwrap_or(DEFAULT_WS_PORT)),
            poll_interval: server
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            data_root: self
                .storage
                .and_then(|storage| storage.data_root)
                .map_or(defaults.data_root, PathBuf::from),
            frontend,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ServerConfig::from_toml_str("").expect("empty config");
        assert_eq!(config.api_listen(), "127.0.0.1:8080");
        assert_eq!(config.ws_listen().as_deref(), Some("127.0.0.1:8081"));
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert!(config.data_root.ends_with("Documents/Nora"));
        assert!(config.frontend.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml_str(
            r#"
[server]
host = "0.0.0.0"
port = 9000
ws_port = 9000
poll_interval_ms = 50

[storage]
data_root = "/srv/nora"

[frontend]
port = 4000
dist_dir = "frontend/web/dist"
"#,
        )
        .expect("parse config");
        assert_eq!(config.api_listen(), "0.0.0.0:9000");
        assert_eq!(config.ws_listen(), None, "same port shares the listener");
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.data_root, PathBuf::from("/srv/nora"));
        let frontend = config.frontend.expect("frontend enabled");
        assert_eq!(frontend.listen(), "0.0.0.0:4000");
        assert_eq!(
            frontend.discovery_path(),
            PathBuf::from("frontend/web/dist/backend.txt")
        );
        assert_eq!(public_host(&frontend.host), "localhost");
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "[server]\npoll_interval_ms = 0\n",
            "[server]\nhost = \"\"\n",
            "[server]\nport = 70000\n",
            "[server]\nunknown = 1\n",
            "[frontend]\nport = 3000\n",
            "[frontend]\ndist_dir = \"d\"\ndiscovery_file = \"a/b.txt\"\n",
        ] {
            let err = ServerConfig::from_toml_str(text).expect_err(text);
            assert!(matches!(err, ServerError::InvalidConfig(_)), "{text}");
        }
    }

    #[test]
    fn disabled_frontend_needs_no_dist_dir() {
        let config = ServerConfig::from_toml_str("[frontend]\nenabled = false\n")
            .expect("disabled frontend");
        assert!(config.frontend.is_none());
    }
}
