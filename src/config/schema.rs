//! Configuration schema definitions.
//!
//! This module defines the option set accepted by the edge server, either from
//! a TOML file or assembled by the CLI. All types derive Serde traits and every
//! field has a default, so an empty file is a valid (if useless) configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default static cache lifetime in seconds.
pub const DEFAULT_CACHE_SECS: u64 = 3600;

/// Fallback content type for static responses.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Root configuration for the edge server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Listener configuration (bind address and port).
    pub listener: ListenerConfig,

    /// Directory to serve static files from. Enables static serving.
    pub root: Option<PathBuf>,

    /// Response headers seeded on every response.
    pub headers: BTreeMap<String, String>,

    /// Static cache lifetime in seconds.
    pub cache: u64,

    /// Render a listing for directories without an index.
    pub show_dir: bool,

    /// Serve `index.html` for directory requests.
    pub auto_index: bool,

    /// Serve files and directories whose name starts with a dot.
    pub show_dotfiles: bool,

    /// Serve precompressed `.gz` variants when the client accepts gzip.
    pub gzip: bool,

    /// Content type used when the file extension gives no better answer.
    pub content_type: String,

    /// Default extension tried for extension-less paths.
    pub ext: Option<ExtOption>,

    /// Enable CORS headers and preflight answers.
    pub cors: bool,

    /// Comma-separated extra header names allowed by CORS.
    pub cors_headers: Option<String>,

    /// `/robots.txt` interception.
    pub robots: Option<RobotsOption>,

    /// Base upstream URL. Enables proxying.
    pub proxy: Option<String>,

    /// Regular expression restricting which paths consult routing cookies.
    pub api_prefix: Option<String>,

    /// TLS for the listener.
    pub https: Option<TlsConfig>,

    /// Logging settings.
    pub log: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            root: None,
            headers: BTreeMap::new(),
            cache: DEFAULT_CACHE_SECS,
            show_dir: true,
            auto_index: true,
            show_dotfiles: false,
            gzip: false,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            ext: None,
            cors: false,
            cors_headers: None,
            robots: None,
            proxy: None,
            api_prefix: None,
            https: None,
            log: LogConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind (e.g., "0.0.0.0").
    pub address: String,

    /// Port to bind.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ListenerConfig {
    /// `address:port`, bracketing IPv6 literals.
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert: PathBuf,

    /// Path to private key file (PEM).
    pub key: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Suppress per-request log lines.
    pub silent: bool,

    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            silent: false,
            level: "edge_server=info,tower_http=info".to_string(),
        }
    }
}

/// `ext = true` means `html`; a string names the extension.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExtOption {
    Enabled(bool),
    Extension(String),
}

impl ExtOption {
    /// The extension to append, without a leading dot.
    pub fn extension(&self) -> Option<String> {
        match self {
            ExtOption::Enabled(true) => Some("html".to_string()),
            ExtOption::Enabled(false) => None,
            ExtOption::Extension(ext) => {
                let ext = ext.trim().trim_start_matches('.');
                (!ext.is_empty()).then(|| ext.to_string())
            }
        }
    }
}

/// `robots = true` serves the default text; a string is served as-is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RobotsOption {
    Enabled(bool),
    Text(String),
}
