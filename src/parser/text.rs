use std::sync::LazyLock;

use regex::Regex;

/// Bodies shorter than this (in chars, after normalization) are stub pages.
pub const MIN_TEXT_CHARS: usize = 100;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

// Publisher boilerplate: follow prompts, reprint notices, original-title labels.
static BOILERPLATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"点击上方.*?设为星标",
        r"本文来自豆瓣.*?原创内容",
        r"感谢作者为豆瓣提供优质原创内容",
        r"由豆瓣用户.*?授权发布",
        r"原文标题[：:][^\n]+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static REPEATED_PUNCT_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"。{2,}").unwrap(), "。"),
        (Regex::new(r"！{2,}").unwrap(), "！"),
        (Regex::new(r"？{2,}").unwrap(), "？"),
    ]
});

/// Rewrite extracted body text into something a TTS voice can read aloud.
pub fn clean_for_tts(raw: &str) -> String {
    let mut text = WHITESPACE_RE.replace_all(raw, " ").into_owned();

    for re in BOILERPLATE_RES.iter() {
        text = re.replace_all(&text, "").into_owned();
    }

    text = URL_RE.replace_all(&text, "").into_owned();
    text.retain(|c| !is_emoji_char(c));

    for (re, single) in REPEATED_PUNCT_RES.iter() {
        text = re.replace_all(&text, *single).into_owned();
    }

    // removals above can leave doubled spaces behind
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn is_emoji_char(c: char) -> bool {
    let cp = c as u32;
    matches!(
        cp,
        0x1F300..=0x1F5FF   // symbols & pictographs
            | 0x1F600..=0x1F64F // emoticons
            | 0x1F680..=0x1F6FF // transport & map
            | 0x1F1E0..=0x1F1FF // regional indicators (flags)
    )
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
