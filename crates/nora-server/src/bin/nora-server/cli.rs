//! CLI definitions for nora-server.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "nora-server",
    version,
    about = "Local project and file server for the Nora desktop app",
    after_help = "Examples:\n  nora-server\n  nora-server --port 9000 --ws-port 9001\n  nora-server --frontend-dir ./frontend/dist --frontend-port 3000\n  nora-server --config nora.toml --verbose"
)]
pub struct Cli {
    /// TOML config file; flags given on the command line win over it.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Interface the API and WebSocket listeners bind to.
    #[arg(long)]
    pub host: Option<String>,
    /// HTTP API port.
    #[arg(long)]
    pub port: Option<u16>,
    /// WebSocket port; pass the API port to serve `/ws` on the API listener.
    #[arg(long)]
    pub ws_port: Option<u16>,
    /// Directory holding the project folders.
    #[arg(long)]
    pub data_root: Option<PathBuf>,
    /// Poll interval of the request loop in milliseconds.
    #[arg(long)]
    pub poll_ms: Option<u64>,
    /// Built frontend to serve; enables the static frontend server.
    #[arg(long)]
    pub frontend_dir: Option<PathBuf>,
    /// Static frontend port.
    #[arg(long, requires = "frontend_dir")]
    pub frontend_port: Option<u16>,
    /// Show debug logging.
    #[arg(long, short)]
    pub verbose: bool,
}
