pub mod document;
pub mod extract;
pub mod text;

use std::path::Path;

use crate::catalog::{audio_path, cover_path, Episode};
use crate::error::SkipReason;
use crate::voice::{episode_id, voice_for_id};
use document::Article;
use text::{char_len, MIN_TEXT_CHARS};

/// An episode fresh out of the parser, still carrying its body text.
#[derive(Debug, Clone)]
pub struct ParsedEpisode {
    pub episode: Episode,
    pub text_content: String,
}

/// Read one saved article page and build its episode.
pub fn process_document(path: &Path, source_label: &str) -> Result<ParsedEpisode, SkipReason> {
    let html = std::fs::read_to_string(path).map_err(|source| SkipReason::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    build_episode(&html, &file_name, source_label)
}

/// document → body text → fields → episode. The id comes from `file_name`
/// alone, so renaming a file gives it a new id and voice.
pub fn build_episode(
    html: &str,
    file_name: &str,
    source_label: &str,
) -> Result<ParsedEpisode, SkipReason> {
    let article = Article::parse(html);
    let container = article.content().ok_or(SkipReason::NoContainer)?;
    let text_content = text::clean_for_tts(&document::container_text(container));

    let chars = char_len(&text_content);
    if chars < MIN_TEXT_CHARS {
        return Err(SkipReason::TooShort {
            chars,
            min: MIN_TEXT_CHARS,
        });
    }

    let fields = extract::extract_all(&article, &text_content);
    let id = episode_id(file_name);
    let voice = voice_for_id(&id).to_string();
    let cover_file = fields.cover_url.as_ref().map(|_| cover_path(&id));

    let episode = Episode {
        title: fields.title,
        author: fields.author,
        source: source_label.to_string(),
        quote: fields.description.clone(),
        description: fields.description,
        cover_url: fields.cover_url,
        voice,
        source_file: file_name.to_string(),
        audio_file: audio_path(&id),
        cover_file,
        duration: 0,
        extra: Default::default(),
        id,
    };

    Ok(ParsedEpisode {
        episode,
        text_content,
    })
}

// ── Tests ──
