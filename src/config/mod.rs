//! Configuration file and environment loading.
//!
//! Settings hydrate CLI flag defaults; explicit flags always win. The file is
//! read on every load — there is deliberately no cached singleton, so
//! concurrent invocations of the core never share state.
//!
//! File search order: `$OS2X_CONFIG`, `./osheet2xlsx.json`,
//! `$XDG_CONFIG_HOME/osheet2xlsx/config.json`, `$HOME/.osheet2xlsx.json`.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub log_level: String,
    pub json: bool,
    pub quiet: bool,
    pub convert: ConvertConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertConfig {
    pub pattern: String,
    pub recursive: bool,
    pub out_dir: String,
    pub overwrite: bool,
    pub dry_run: bool,
    pub fail_fast: bool,
}

/// Load configuration from the first existing candidate file, then apply
/// `OS2X_*` environment overrides. Unreadable or invalid files degrade to
/// defaults rather than failing the command.
pub fn load() -> Config {
    let mut cfg = Config::default();

    for path in candidate_paths() {
        if path.is_file() {
            if let Ok(data) = std::fs::read(&path) {
                if let Ok(parsed) = serde_json::from_slice::<Config>(&data) {
                    cfg = parsed;
                }
            }
            break;
        }
    }

    apply_env_overrides(&mut cfg);
    cfg
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(explicit) = std::env::var("OS2X_CONFIG") {
        if !explicit.is_empty() {
            paths.push(PathBuf::from(explicit));
        }
    }
    paths.push(PathBuf::from("osheet2xlsx.json"));
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            paths.push(PathBuf::from(xdg).join("osheet2xlsx").join("config.json"));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            paths.push(PathBuf::from(home).join(".osheet2xlsx.json"));
        }
    }
    paths
}

fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("OS2X_LOG_LEVEL") {
        if !v.is_empty() {
            cfg.log_level = v;
        }
    }
    if let Some(v) = env_bool("OS2X_JSON") {
        cfg.json = v;
    }
    if let Some(v) = env_bool("OS2X_QUIET") {
        cfg.quiet = v;
    }
    if let Ok(v) = std::env::var("OS2X_CONVERT_PATTERN") {
        if !v.is_empty() {
            cfg.convert.pattern = v;
        }
    }
    if let Some(v) = env_bool("OS2X_CONVERT_RECURSIVE") {
        cfg.convert.recursive = v;
    }
    if let Ok(v) = std::env::var("OS2X_CONVERT_OUT_DIR") {
        if !v.is_empty() {
            cfg.convert.out_dir = v;
        }
    }
    if let Some(v) = env_bool("OS2X_CONVERT_OVERWRITE") {
        cfg.convert.overwrite = v;
    }
    if let Some(v) = env_bool("OS2X_CONVERT_DRY_RUN") {
        cfg.convert.dry_run = v;
    }
    if let Some(v) = env_bool("OS2X_CONVERT_FAIL_FAST") {
        cfg.convert.fail_fast = v;
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
