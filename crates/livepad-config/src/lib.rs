use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "livepad.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub cdn_origin: Option<String>,
    pub ui_package: Option<String>,
    pub ui_global: Option<String>,
    pub share_base_url: Option<String>,
    pub shortener_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvConfig {
    pub cdn_origin: Option<String>,
    pub ui_package: Option<String>,
    pub ui_global: Option<String>,
    pub share_base_url: Option<String>,
    pub shortener_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub verbose: Option<bool>,
}

/// Values given explicitly on the command line. `None` means "not passed".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    pub cdn_origin: Option<String>,
    pub ui_package: Option<String>,
    pub ui_global: Option<String>,
    pub share_base_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cdn_origin: String,
    pub ui_package: String,
    pub ui_global: String,
    pub share_base_url: String,
    pub shortener_url: String,
    pub host: String,
    pub port: u16,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cdn_origin: "https://esm.sh".to_string(),
            ui_package: "react".to_string(),
            ui_global: "React".to_string(),
            share_base_url: "http://127.0.0.1:4173/".to_string(),
            shortener_url: "https://shorta.link".to_string(),
            host: "127.0.0.1".to_string(),
            port: 4173,
            verbose: false,
        }
    }
}

pub fn load_file_config(explicit_path: Option<&Path>, cwd: &Path) -> Result<Option<FileConfig>> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => {
            let candidate = cwd.join(CONFIG_FILE_NAME);
            if !candidate.exists() {
                return Ok(None);
            }
            candidate
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed reading config file {}", path.display()))?;
    let parsed: FileConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing config file {}", path.display()))?;
    Ok(Some(parsed))
}

impl EnvConfig {
    pub fn from_current_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the env layer from an arbitrary lookup so tests never touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            cdn_origin: non_empty(lookup("LIVEPAD_CDN_ORIGIN")),
            ui_package: non_empty(lookup("LIVEPAD_UI_PACKAGE")),
            ui_global: non_empty(lookup("LIVEPAD_UI_GLOBAL")),
            share_base_url: non_empty(lookup("LIVEPAD_SHARE_BASE_URL")),
            shortener_url: non_empty(lookup("LIVEPAD_SHORTENER_URL")),
            host: non_empty(lookup("LIVEPAD_HOST")),
            port: lookup("LIVEPAD_PORT").and_then(|v| v.trim().parse().ok()),
            verbose: lookup("LIVEPAD_VERBOSE").and_then(|v| parse_bool(&v)),
        }
    }
}

pub fn resolve_settings(
    cli: &CliOverrides,
    env_cfg: &EnvConfig,
    file_cfg: Option<&FileConfig>,
) -> Settings {
    let base = Settings::default();

    let cdn_origin = cli
        .cdn_origin
        .clone()
        .or_else(|| env_cfg.cdn_origin.clone())
        .or_else(|| file_cfg.and_then(|c| c.cdn_origin.clone()))
        .unwrap_or(base.cdn_origin);

    let ui_package = cli
        .ui_package
        .clone()
        .or_else(|| env_cfg.ui_package.clone())
        .or_else(|| file_cfg.and_then(|c| c.ui_package.clone()))
        .unwrap_or(base.ui_package);

    let ui_global = cli
        .ui_global
        .clone()
        .or_else(|| env_cfg.ui_global.clone())
        .or_else(|| file_cfg.and_then(|c| c.ui_global.clone()))
        .unwrap_or(base.ui_global);

    let share_base_url = cli
        .share_base_url
        .clone()
        .or_else(|| env_cfg.share_base_url.clone())
        .or_else(|| file_cfg.and_then(|c| c.share_base_url.clone()))
        .unwrap_or(base.share_base_url);

    // No CLI flag for the shortener; it is an integration endpoint.
    let shortener_url = env_cfg
        .shortener_url
        .clone()
        .or_else(|| file_cfg.and_then(|c| c.shortener_url.clone()))
        .unwrap_or(base.shortener_url);

    let host = cli
        .host
        .clone()
        .or_else(|| env_cfg.host.clone())
        .or_else(|| file_cfg.and_then(|c| c.host.clone()))
        .unwrap_or(base.host);

    let port = cli
        .port
        .or(env_cfg.port)
        .or(file_cfg.and_then(|c| c.port))
        .unwrap_or(base.port);

    let verbose = cli
        .verbose
        .or(env_cfg.verbose)
        .or(file_cfg.and_then(|c| c.verbose))
        .unwrap_or(base.verbose);

    Settings {
        cdn_origin,
        ui_package,
        ui_global,
        share_base_url,
        shortener_url,
        host,
        port,
        verbose,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
