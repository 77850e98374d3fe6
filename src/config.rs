//! Server configuration: listen address, routes root, built assets.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root directory of handler modules; nesting encodes URL segments.
    pub routes_dir: PathBuf,
    /// Directory of built assets consulted after a table miss.
    pub static_dir: PathBuf,
    /// Shell document, relative to `static_dir`.
    pub shell: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            routes_dir: PathBuf::from("routes"),
            static_dir: PathBuf::from("dist"),
            shell: "index.html".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads PORT, HOST, ROUTES_DIR, STATIC_DIR and SHELL_FILE from the
    /// environment, defaulting anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Ok(dir) = env::var("ROUTES_DIR") {
            config.routes_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Ok(shell) = env::var("SHELL_FILE") {
            config.shell = shell;
        }
        config
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
