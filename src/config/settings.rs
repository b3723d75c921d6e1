//! Compiled, typed settings.
//!
//! `ServerConfig` is what operators write; `Settings` is what the pipeline
//! consumes. Each optional feature becomes an explicit optional
//! sub-configuration, and the pipeline decides which interceptors to install
//! purely from which of these are present.

use axum::http::HeaderMap;
use regex::Regex;
use std::path::PathBuf;
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::{RobotsOption, ServerConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::http::headers::{compute_headers, CorsHeaders};
use crate::net::tls;

/// Immutable settings shared by every request.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Final header set seeded on every response.
    pub headers: HeaderMap,
    pub cors: Option<CorsHeaders>,
    pub robots: Option<RobotsPolicy>,
    pub static_files: Option<StaticSettings>,
    pub proxy: Option<ProxySettings>,
    pub tls: Option<TlsSettings>,
    pub bind_address: String,
}

/// Static-file engine settings.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    pub root: PathBuf,
    pub cache_secs: u64,
    pub show_dir: bool,
    pub auto_index: bool,
    pub show_dotfiles: bool,
    pub gzip: bool,
    pub default_content_type: String,
    pub default_extension: Option<String>,
    /// Answer not-found and bad-method requests here instead of deferring.
    pub handle_error: bool,
}

/// Proxy settings.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub base_target: Url,
    pub api_prefix: Option<Regex>,
}

/// Body served for `/robots.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsPolicy {
    Default,
    Custom(String),
}

/// Listener TLS material.
#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Settings {
    /// Validate and compile a configuration. Fails fast on any problem.
    pub fn compile(config: &ServerConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let cors = config
            .cors
            .then(|| CorsHeaders::new(config.cors_headers.as_deref()));
        let headers = compute_headers(&config.headers, cors.as_ref())?;

        let robots = match &config.robots {
            None | Some(RobotsOption::Enabled(false)) => None,
            Some(RobotsOption::Enabled(true)) => Some(RobotsPolicy::Default),
            Some(RobotsOption::Text(text)) => Some(RobotsPolicy::Custom(text.clone())),
        };

        let proxy = match &config.proxy {
            Some(target) => Some(ProxySettings {
                base_target: Url::parse(target).map_err(|e| ValidationError::ProxyTarget {
                    target: target.clone(),
                    reason: e.to_string(),
                })?,
                api_prefix: config
                    .api_prefix
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| ValidationError::ApiPrefix(e.to_string()))?,
            }),
            None => None,
        };

        let static_files = config.root.as_ref().map(|root| StaticSettings {
            root: root.clone(),
            cache_secs: config.cache,
            show_dir: config.show_dir,
            auto_index: config.auto_index,
            show_dotfiles: config.show_dotfiles,
            gzip: config.gzip,
            default_content_type: config.content_type.clone(),
            default_extension: config.ext.as_ref().and_then(|ext| ext.extension()),
            handle_error: proxy.is_none(),
        });

        let tls = match &config.https {
            Some(tls_config) => {
                tls::check_pem_files(&tls_config.cert, &tls_config.key)
                    .map_err(|e| ConfigError::Tls(e.to_string()))?;
                Some(TlsSettings {
                    cert: tls_config.cert.clone(),
                    key: tls_config.key.clone(),
                })
            }
            None => None,
        };

        Ok(Self {
            headers,
            cors,
            robots,
            static_files,
            proxy,
            tls,
            bind_address: config.listener.bind_address(),
        })
    }
}
