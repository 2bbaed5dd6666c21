use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::catalog::Layout;
use crate::config::Settings;
use crate::parser::ParsedEpisode;

const BASE_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 60_000;

pub struct DownloadStats {
    pub ok: usize,
    pub cached: usize,
    pub failed: usize,
}

pub fn client(settings: &Settings) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(Duration::from_secs(settings.download_timeout_secs))
        .build()?)
}

/// Fetch the cover of every parsed episode that has one. A failed download
/// clears that episode's `cover_file`; nothing here fails the batch.
pub async fn download_covers(
    client: &reqwest::Client,
    layout: &Layout,
    parsed: &mut [ParsedEpisode],
    max_retries: u32,
) -> DownloadStats {
    let mut stats = DownloadStats {
        ok: 0,
        cached: 0,
        failed: 0,
    };
    let wanted = parsed
        .iter()
        .filter(|p| p.episode.cover_url.is_some())
        .count();
    let pb = ProgressBar::new(wanted as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} covers") {
        pb.set_style(style.progress_chars("=> "));
    }

    for p in parsed.iter_mut() {
        let ep = &mut p.episode;
        let (Some(url), Some(rel)) = (ep.cover_url.as_deref(), ep.cover_file.as_deref()) else {
            continue;
        };
        let dest = layout.resolve(rel);

        if dest.exists() {
            stats.cached += 1;
        } else {
            match fetch_with_retry(client, url, &dest, max_retries).await {
                Ok(()) => stats.ok += 1,
                Err(e) => {
                    warn!("Cover download failed for {} ({}): {}", ep.id, url, e);
                    ep.cover_file = None;
                    stats.failed += 1;
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Covers: {} downloaded, {} already on disk, {} failed",
        stats.ok, stats.cached, stats.failed
    );
    stats
}

/// Clear `cover_file` everywhere; used when downloads are switched off.
pub fn skip_covers(parsed: &mut [ParsedEpisode], layout: &Layout) {
    for p in parsed.iter_mut() {
        let on_disk = p
            .episode
            .cover_file
            .as_deref()
            .is_some_and(|rel| layout.resolve(rel).exists());
        if !on_disk {
            p.episode.cover_file = None;
        }
    }
}

async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    max_retries: u32,
) -> Result<()> {
    let mut attempt = 0;
    loop {
        match fetch_once(client, url, dest).await {
            Ok(()) => return Ok(()),
            Err(FetchError::Retryable(msg)) if attempt < max_retries => {
                let backoff = backoff_delay(attempt);
                warn!(
                    "{} on {} (attempt {}/{}), backing off {:.1}s",
                    msg,
                    url,
                    attempt + 1,
                    max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(FetchError::Retryable(msg)) | Err(FetchError::Fatal(msg)) => bail!(msg),
        }
    }
}

/// Doubles per attempt, capped at a minute.
fn backoff_delay(attempt: u32) -> Duration {
    let ms = BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

enum FetchError {
    Retryable(String),
    Fatal(String),
}

async fn fetch_once(client: &reqwest::Client, url: &str, dest: &Path) -> Result<(), FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Fatal(e.to_string()))?;

    let status = response.status();
    if should_retry(status) {
        return Err(FetchError::Retryable(format!("HTTP {}", status)));
    }
    if !status.is_success() {
        return Err(FetchError::Fatal(format!("HTTP {}", status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Fatal(e.to_string()))?;
    write_atomic(dest, &bytes).map_err(|e| FetchError::Fatal(e.to_string()))
}

/// Write next to `dest`, then rename over it, so `dest` only ever holds a
/// complete image.
fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = dest.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut partial = dest.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);
    std::fs::write(&partial, bytes)?;
    std::fs::rename(&partial, dest).inspect_err(|_| {
        let _ = std::fs::remove_file(&partial);
    })
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
