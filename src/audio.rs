use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use lofty::prelude::*;
use lofty::probe::Probe;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Episode, Layout};
use crate::error::AudioError;

/// Turns a text file into speech at `output` using the given voice.
#[allow(async_fn_in_trait)]
pub trait Synthesizer {
    async fn synthesize(&self, text_file: &Path, voice: &str, output: &Path) -> Result<(), AudioError>;
}

/// Shells out to the `edge-tts` CLI (or anything accepting its flags).
pub struct EdgeTts {
    command: String,
}

impl EdgeTts {
    pub fn new(command: impl Into<String>) -> Self {
        EdgeTts {
            command: command.into(),
        }
    }
}

impl Synthesizer for EdgeTts {
    async fn synthesize(&self, text_file: &Path, voice: &str, output: &Path) -> Result<(), AudioError> {
        let result = tokio::process::Command::new(&self.command)
            .arg("--voice")
            .arg(voice)
            .arg("--file")
            .arg(text_file)
            .arg("--write-media")
            .arg(output)
            .output()
            .await
            .map_err(|source| AudioError::Launch {
                command: self.command.clone(),
                source,
            })?;

        if !result.status.success() {
            // a half-written mp3 would otherwise be taken as done next run
            let _ = tokio::fs::remove_file(output).await;
            return Err(AudioError::Synthesis {
                command: self.command.clone(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Whole seconds of audio in `path`.
pub fn try_probe_duration(path: &Path) -> Result<u64, AudioError> {
    let tagged = Probe::open(path)
        .map_err(|e| AudioError::Probe(e.to_string()))?
        .read()
        .map_err(|e| AudioError::Probe(e.to_string()))?;
    Ok(tagged.properties().duration().as_secs())
}

/// Like [`try_probe_duration`] but 0 on any failure.
pub fn probe_duration(path: &Path) -> u64 {
    try_probe_duration(path).unwrap_or_else(|e| {
        warn!("Cannot read duration of {}: {}", path.display(), e);
        0
    })
}

pub struct SynthesisStats {
    pub total: usize,
    pub succeeded: usize,
}

/// Give every catalog episode audio and a duration. Episodes whose audio
/// already exists are only probed. Failures leave `duration = 0`.
pub async fn synthesize_catalog<S: Synthesizer>(
    synth: &S,
    layout: &Layout,
    catalog: &mut Catalog,
    limit: Option<usize>,
) -> SynthesisStats {
    let n = limit
        .unwrap_or(catalog.episodes.len())
        .min(catalog.episodes.len());
    let pb = ProgressBar::new(n as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut succeeded = 0;
    for ep in catalog.episodes.iter_mut().take(n) {
        pb.set_message(ep.id.clone());
        match synthesize_episode(synth, layout, ep).await {
            Ok(duration) => {
                ep.duration = duration;
                succeeded += 1;
                info!(
                    "{} {}: {}:{:02}",
                    ep.id,
                    ep.title,
                    duration / 60,
                    duration % 60
                );
            }
            Err(e) => {
                warn!("Synthesis failed for {} ({}): {}", ep.id, ep.title, e);
                ep.duration = 0;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    SynthesisStats {
        total: n,
        succeeded,
    }
}

async fn synthesize_episode<S: Synthesizer>(
    synth: &S,
    layout: &Layout,
    ep: &Episode,
) -> Result<u64, AudioError> {
    let text_file = layout.text_file(&ep.id);
    if !text_file.exists() {
        return Err(AudioError::MissingText(text_file));
    }
    let audio_file = layout.resolve(&ep.audio_file);

    if audio_file.exists() {
        debug!("{} already has audio, probing only", ep.id);
    } else {
        if let Some(dir) = audio_file.parent() {
            std::fs::create_dir_all(dir)?;
        }
        debug!("{}: synthesizing with {}", ep.id, ep.voice);
        synth.synthesize(&text_file, &ep.voice, &audio_file).await?;
    }

    Ok(probe_duration(&audio_file))
}
