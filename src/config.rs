//! Runtime configuration, resolved once at startup.
//!
//! Values arrive from CLI flags or their environment variables (see `main.rs`)
//! and are normalized here into an [`AppConfig`] that is handed to the router.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{bail, Result};

/// Default SQLite file location.
pub const DEFAULT_DB_PATH: &str = "/data/db.sqlite";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Normalized service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Shared secret for the webhook endpoint. `None` leaves ingestion open.
    pub api_token: Option<String>,
    /// Base path the whole app is mounted under, e.g. `/ci`. Empty for root.
    pub path_prefix: String,
    /// Footer text override exposed to the frontend.
    pub footer_text: Option<String>,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            path_prefix: String::new(),
            footer_text: None,
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl AppConfig {
    /// Build a config from raw flag/env values.
    ///
    /// Empty tokens are treated as unset; footer text is kept only when it is
    /// not blank.
    pub fn new(
        api_token: Option<String>,
        path_prefix: Option<String>,
        footer_text: Option<String>,
        port: u16,
        db_path: PathBuf,
    ) -> Self {
        Self {
            api_token: api_token.filter(|t| !t.is_empty()),
            path_prefix: normalize_path_prefix(path_prefix.as_deref().unwrap_or_default()),
            footer_text: footer_text.filter(|t| !t.trim().is_empty()),
            port,
            db_path,
        }
    }

    /// Reject a prefix the router cannot mount. Route syntax characters
    /// would be read as path parameters or wildcards.
    pub fn validate(&self) -> Result<()> {
        if self.path_prefix.contains(['{', '}', '*']) {
            bail!(
                "invalid path prefix {:?}: '{{', '}}' and '*' are not allowed",
                self.path_prefix
            );
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

/// Normalize a mount prefix: trimmed, leading `/` forced, trailing `/`s
/// stripped. Input made only of slashes means "no prefix".
pub fn normalize_path_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
