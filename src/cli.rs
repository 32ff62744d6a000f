//! Command line arguments
//!
//! Every flag is optional; anything left out falls back to the config file,
//! `NOCACHE_*` environment variables, then built-in defaults.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "nocache-server")]
#[command(about = "Serve a directory over HTTP with caching disabled on every response")]
#[command(version)]
pub struct Cli {
    /// Port to listen on (default 8000)
    pub port: Option<u16>,

    /// Address to bind (default: all interfaces)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Directory to serve (default: current directory)
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Path to a config file
    #[arg(short, long, env = "NOCACHE_CONFIG")]
    pub config: Option<String>,
}
