use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::inbox::{DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZES};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Write tracing output here (overridden by `$SAFEDESK_LOG`).
    pub log_file: Option<String>,
    pub api: ApiConfig,
    pub inbox: InboxConfig,
    pub session: SessionConfig,
    /// Key -> action name, e.g. `x = "toggle_select"`.
    pub bindings: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout. None means requests are never cut off.
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InboxConfig {
    pub page_size: usize,
    pub page_sizes: Vec<usize>,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Keep the credential on disk between runs.
    pub remember: bool,
    pub token_file: Option<String>,
}

impl SessionConfig {
    /// Where a remembered credential lives, if remembering is on.
    ///
    /// Defaults to `$XDG_STATE_HOME/safedesk/token`, then
    /// `~/.local/state/safedesk/token`.
    pub fn effective_token_file(&self) -> Option<PathBuf> {
        if !self.remember {
            return None;
        }
        if let Some(path) = &self.token_file {
            return Some(PathBuf::from(expand_tilde(path)));
        }
        if let Ok(state) = std::env::var("XDG_STATE_HOME") {
            return Some(PathBuf::from(state).join("safedesk").join("token"));
        }
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("safedesk")
                .join("token")
        })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Try to load the configuration file from, in order:
    ///
    /// 1. `$SAFEDESK_CONFIG`
    /// 2. `$XDG_CONFIG_HOME/safedesk/config.toml`
    /// 3. `~/.config/safedesk/config.toml`
    ///
    /// If none of these paths exist, return a default `Config`.
    /// `$SAFEDESK_API_URL` overrides `api.base_url` either way.
    pub fn load() -> Result<Self> {
        let mut config = if let Some(path) = Self::locate() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };
        if let Ok(url) = std::env::var("SAFEDESK_API_URL") {
            let url = url.trim();
            if !url.is_empty() {
                config.api.base_url = url.to_string();
            }
        }
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Log path from `$SAFEDESK_LOG`, else `log_file`.
    pub fn effective_log_file(&self) -> Option<PathBuf> {
        std::env::var("SAFEDESK_LOG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.log_file.clone())
            .map(|p| PathBuf::from(expand_tilde(&p)))
    }

    /// Return the first config path that actually exists on disk, or `None`.
    fn locate() -> Option<PathBuf> {
        let candidates = Self::candidate_paths();
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Ordered list of paths we check for a config file.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(p) = std::env::var("SAFEDESK_CONFIG") {
            paths.push(PathBuf::from(p));
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("safedesk").join("config.toml"));
        }

        if let Ok(home) = std::env::var("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("safedesk")
                    .join("config.toml"),
            );
        }

        paths
    }
}

/// Expand `~/` prefix in a path string.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        format!("{}/{}", home, rest)
    } else {
        path.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
