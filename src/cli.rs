//! Command-line front end.
//!
//! Values given on the command line override the config file, which
//! overrides the built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{
    read_config, ConfigError, ExtOption, RobotsOption, ServerConfig, TlsConfig,
};

#[derive(Debug, Parser)]
#[command(name = "edge-server")]
#[command(about = "Static file server with robots, CORS and a cookie-routed reverse proxy", long_about = None)]
pub struct Cli {
    /// Directory to serve
    pub root: Option<PathBuf>,

    /// Address to bind
    #[arg(short = 'a', long)]
    pub address: Option<String>,

    /// Port to bind
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Cache max-age in seconds
    #[arg(short = 'c', long)]
    pub cache: Option<u64>,

    /// Serve precompressed `.gz` files when the client accepts gzip
    #[arg(short = 'g', long)]
    pub gzip: bool,

    /// Default extension for extension-less paths
    #[arg(short = 'e', long)]
    pub ext: Option<String>,

    /// Show directory listings
    #[arg(short = 'd', long, value_name = "BOOL")]
    pub show_dir: Option<bool>,

    /// Serve index.html for directories
    #[arg(short = 'i', long, value_name = "BOOL")]
    pub auto_index: Option<bool>,

    /// Serve files whose path contains a dot segment
    #[arg(long)]
    pub dotfiles: bool,

    /// Enable CORS, optionally with extra comma-separated allowed headers
    #[arg(long, value_name = "HEADERS", num_args = 0..=1, require_equals = true)]
    pub cors: Option<Option<String>>,

    /// Answer /robots.txt, optionally with custom text
    #[arg(long, value_name = "TEXT", num_args = 0..=1, require_equals = true)]
    pub robots: Option<Option<String>>,

    /// Proxy unmatched requests to this URL
    #[arg(short = 'P', long)]
    pub proxy: Option<String>,

    /// Paths matching this regex may be rerouted by cookies
    #[arg(long)]
    pub api_prefix: Option<String>,

    /// Serve over TLS
    #[arg(short = 'S', long)]
    pub ssl: bool,

    /// TLS certificate (PEM)
    #[arg(short = 'C', long)]
    pub cert: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(short = 'K', long)]
    pub key: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Suppress per-request log lines
    #[arg(short = 's', long)]
    pub silent: bool,
}

impl Cli {
    /// Read the config file (if any) and apply the command-line overrides.
    /// Validation happens when the server is created.
    pub fn load(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(address) = &self.address {
            config.listener.address = address.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(cache) = self.cache {
            config.cache = cache;
        }
        if self.gzip {
            config.gzip = true;
        }
        if let Some(ext) = &self.ext {
            config.ext = Some(ExtOption::Extension(ext.clone()));
        }
        if let Some(show_dir) = self.show_dir {
            config.show_dir = show_dir;
        }
        if let Some(auto_index) = self.auto_index {
            config.auto_index = auto_index;
        }
        if self.dotfiles {
            config.show_dotfiles = true;
        }
        if let Some(headers) = &self.cors {
            config.cors = true;
            if headers.is_some() {
                config.cors_headers = headers.clone();
            }
        }
        if let Some(text) = &self.robots {
            config.robots = Some(match text {
                Some(text) => RobotsOption::Text(text.clone()),
                None => RobotsOption::Enabled(true),
            });
        }
        if let Some(proxy) = &self.proxy {
            config.proxy = Some(proxy.clone());
        }
        if let Some(prefix) = &self.api_prefix {
            config.api_prefix = Some(prefix.clone());
        }

        if self.ssl || config.https.is_some() {
            let current = config.https.take().unwrap_or_else(|| TlsConfig {
                cert: PathBuf::from("cert.pem"),
                key: PathBuf::from("key.pem"),
            });
            config.https = Some(TlsConfig {
                cert: self.cert.clone().unwrap_or(current.cert),
                key: self.key.clone().unwrap_or(current.key),
            });
        }

        if self.silent {
            config.log.silent = true;
        }
    }
}
