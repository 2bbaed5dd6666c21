use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::parser::document::Article;

/// Alt-text fragments of follow prompts, QR codes and masthead art.
const SKIP_ALT_KEYWORDS: &[&str] = &[
    "风里雨里",
    "每天等你",
    "点击上方",
    "设为星标",
    "关注我们",
    "二维码",
    "qrcode",
    "qr code",
    "follow us",
    "logo",
    "banner",
    "公众号",
];

// Animated GIFs and the small webp icons the template sprinkles around.
static SKIP_URL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)wx_fmt=gif", r"(?i)\.gif(?:$|[?#])", r"(?i)tp=webp"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

const MIN_WIDTH: i64 = 200;

/// First content image in the article body that isn't decoration.
pub fn extract(article: &Article) -> Option<String> {
    let content = article.content()?;
    content.select(&IMG_SEL).find_map(candidate_url)
}

fn candidate_url(img: ElementRef<'_>) -> Option<String> {
    let el = img.value();
    let url = el
        .attr("data-src")
        .filter(|u| !u.is_empty())
        .or_else(|| el.attr("src"))
        .unwrap_or("");
    if url.is_empty() || url.starts_with("data:") {
        return None;
    }
    if should_skip(url, el.attr("alt").unwrap_or("")) {
        return None;
    }
    let width = el
        .attr("data-w")
        .filter(|w| !w.is_empty())
        .or_else(|| el.attr("width"));
    if width.is_some_and(too_narrow) {
        return None;
    }
    Some(url.to_string())
}

fn should_skip(url: &str, alt: &str) -> bool {
    let alt = alt.to_lowercase();
    SKIP_ALT_KEYWORDS.iter().any(|kw| alt.contains(kw))
        || SKIP_URL_RES.iter().any(|re| re.is_match(url))
}

/// Only a width that parses as an integer can disqualify an image.
fn too_narrow(width: &str) -> bool {
    width
        .trim()
        .parse::<i64>()
        .map(|w| w < MIN_WIDTH)
        .unwrap_or(false)
}
