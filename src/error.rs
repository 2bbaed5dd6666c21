use std::path::PathBuf;

use thiserror::Error;

/// Why a source document produced no episode. None of these stop a batch.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no content container (#js_content / .rich_media_content)")]
    NoContainer,

    #[error("body text too short ({chars} chars, need {min})")]
    TooShort { chars: usize, min: usize },
}

/// Failures from the audio collaborators. Callers degrade these to a zero
/// duration.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("text file not found: {}", .0.display())]
    MissingText(PathBuf),

    #[error("failed to launch {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Synthesis {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("cannot read audio properties: {0}")]
    Probe(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
