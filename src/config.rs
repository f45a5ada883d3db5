//! Settings layering: defaults, then the TOML file, then environment. CLI flags are
//! applied last by `cli::resolve_settings`.

use crate::model::Language;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/run";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub language: Language,
    pub save_dir: PathBuf,
    pub log_level: String,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            language: Language::Python,
            save_dir: PathBuf::from("."),
            log_level: DEFAULT_LOG_LEVEL.into(),
            user_agent: format!("vizrun/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// On-disk shape; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    endpoint: Option<String>,
    language: Option<Language>,
    save_dir: Option<PathBuf>,
    log_level: Option<String>,
    user_agent: Option<String>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vizrun").join("config.toml"))
}

/// Load settings. An explicit `path` must exist; the default location may be absent.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("read config file {}", p.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("parse config file {}", p.display()))?;
        }
        None => {
            if let Some(p) = default_config_path() {
                if let Ok(raw) = std::fs::read_to_string(&p) {
                    apply_file(&mut settings, &raw)
                        .with_context(|| format!("parse config file {}", p.display()))?;
                }
            }
        }
    }

    apply_env(&mut settings, |k| std::env::var(k).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.endpoint {
        settings.endpoint = v;
    }
    if let Some(v) = file.language {
        settings.language = v;
    }
    if let Some(v) = file.save_dir {
        settings.save_dir = v;
    }
    if let Some(v) = file.log_level {
        settings.log_level = v;
    }
    if let Some(v) = file.user_agent {
        settings.user_agent = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, get: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = get("VIZRUN_ENDPOINT") {
        settings.endpoint = v;
    }
    if let Some(v) = get("VIZRUN_LANGUAGE") {
        settings.language = v.parse().context("VIZRUN_LANGUAGE")?;
    }
    if let Some(v) = get("VIZRUN_SAVE_DIR") {
        settings.save_dir = PathBuf::from(v);
    }
    if let Some(v) = get("VIZRUN_LOG") {
        settings.log_level = v;
    }
    Ok(())
}
