use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

use crate::parser::document::Article;

pub const ANONYMOUS: &str = "佚名";

/// Value some pages put in `<meta name="author">` when the real byline is absent.
const PLACEHOLDER_AUTHOR: &str = "豆瓣用户";

/// How much of the body is scanned for a byline phrase.
const HEAD_CHARS: usize = 500;

// Name tokens: Latin letters or CJK unified ideographs. Priority order.
static BYLINE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^([A-Za-z\x{4e00}-\x{9fa5}]{1,10})\s+每日豆瓣",
        r"(?i)作者[：:]\s*([A-Za-z\x{4e00}-\x{9fa5}]{1,20})",
        r"(?i)文[/／]\s*([A-Za-z\x{4e00}-\x{9fa5}]{1,20})",
        r"(?i)by\s+([A-Za-z\x{4e00}-\x{9fa5}]{1,20})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static BYLINE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.rich_media_meta_text").unwrap());

/// Author chain: byline phrase in the body head, byline widget, author meta,
/// then the anonymous sentinel.
pub fn extract(article: &Article, body: &str) -> String {
    from_body_head(body)
        .or_else(|| from_byline_widget(article))
        .or_else(|| from_meta_author(article))
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

fn from_body_head(body: &str) -> Option<String> {
    let head: String = body.chars().take(HEAD_CHARS).collect();
    BYLINE_RES.iter().find_map(|re| {
        re.captures(&head)
            .map(|caps| caps[1].trim().to_string())
            .filter(|name| !name.is_empty())
    })
}

fn from_byline_widget(article: &Article) -> Option<String> {
    article
        .first_text(&BYLINE_SEL)
        .map(|text| repair_duplicated(&text).to_string())
        .filter(|name| !name.is_empty())
}

fn from_meta_author(article: &Article) -> Option<String> {
    article
        .meta_name("author")
        .filter(|a| !a.is_empty() && a != PLACEHOLDER_AUTHOR)
}

/// Collapse a name the upstream template rendered twice ("李雷李雷").
/// Only an exact half/half split counts; strings of two chars or fewer are
/// left alone.
pub fn repair_duplicated(s: &str) -> &str {
    let n = s.chars().count();
    if n <= 2 {
        return s;
    }
    let (mid, _) = s
        .char_indices()
        .nth(n / 2)
        .unwrap_or((s.len(), ' '));
    let (first, second) = s.split_at(mid);
    if first == second {
        first
    } else {
        s
    }
}
