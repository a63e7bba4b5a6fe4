use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::SessionConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub reply_delay_ms: u64,
    pub history_path: PathBuf,
    pub seed_dir: Option<PathBuf>,
    pub latency_scale: f64,
    pub rng_seed: Option<u64>,
    pub log_filter: String,
    pub search_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reply_delay_ms: 1500,
            history_path: PathBuf::from("./data/console_state.json"),
            seed_dir: None,
            latency_scale: 1.0,
            rng_seed: None,
            log_filter: "info".into(),
            search_limit: storage::SEARCH_RESULT_LIMIT,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            reply_delay: Duration::from_millis(self.reply_delay_ms),
            search_limit: self.search_limit,
            ..SessionConfig::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    reply_delay_ms: Option<u64>,
    history_path: Option<PathBuf>,
    seed_dir: Option<PathBuf>,
    latency_scale: Option<f64>,
    rng_seed: Option<u64>,
    log_filter: Option<String>,
    search_limit: Option<usize>,
}

/// Defaults, then the TOML file, then `APP__*` environment variables.
///
/// An explicit `path` must exist; the default `console.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if required => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file.reply_delay_ms {
        settings.reply_delay_ms = v;
    }
    if let Some(v) = file.history_path {
        settings.history_path = v;
    }
    if file.seed_dir.is_some() {
        settings.seed_dir = file.seed_dir;
    }
    if let Some(v) = file.latency_scale {
        settings.latency_scale = v;
    }
    if file.rng_seed.is_some() {
        settings.rng_seed = file.rng_seed;
    }
    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file.search_limit {
        settings.search_limit = v;
    }
    validate(settings)
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__REPLY_DELAY_MS") {
        settings.reply_delay_ms = parse_env("APP__REPLY_DELAY_MS", &v)?;
    }
    if let Some(v) = lookup("APP__HISTORY_PATH") {
        settings.history_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("APP__SEED_DIR") {
        settings.seed_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup("APP__LATENCY_SCALE") {
        settings.latency_scale = parse_env("APP__LATENCY_SCALE", &v)?;
    }
    if let Some(v) = lookup("APP__RNG_SEED") {
        settings.rng_seed = Some(parse_env("APP__RNG_SEED", &v)?);
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__SEARCH_LIMIT") {
        settings.search_limit = parse_env("APP__SEARCH_LIMIT", &v)?;
    }
    validate(settings)
}

fn parse_env<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}

fn validate(settings: &Settings) -> anyhow::Result<()> {
    if !settings.latency_scale.is_finite() || settings.latency_scale < 0.0 {
        bail!("latency_scale must be a non-negative number");
    }
    if settings.search_limit == 0 {
        bail!("search_limit must be at least 1");
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
