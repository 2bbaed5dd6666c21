use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "serendipity.toml";
const ENV_PREFIX: &str = "SERENDIPITY";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory scanned for saved `*.html` article pages.
    pub source_dir: PathBuf,
    /// Root for `data/`, `covers/` and `audio/`.
    pub output_dir: PathBuf,
    /// Stamped into every episode's `source` field.
    pub source_label: String,
    /// edge-tts compatible executable.
    pub tts_command: String,
    pub download_timeout_secs: u64,
    pub download_retries: u32,
    pub user_agent: String,
}

impl Settings {
    /// Defaults, then `serendipity.toml` (or `path`), then `SERENDIPITY_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Config::builder()
            .set_default("source_dir", ".")?
            .set_default("output_dir", ".")?
            .set_default("source_label", "每日豆瓣")?
            .set_default("tts_command", "edge-tts")?
            .set_default("download_timeout_secs", 10)?
            .set_default("download_retries", 2)?
            .set_default(
                "user_agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
            )?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}
