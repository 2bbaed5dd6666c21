use std::sync::LazyLock;

use scraper::Selector;

use super::{first_of, Extractor};
use crate::parser::document::Article;

pub const UNTITLED: &str = "未命名文章";

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

const CHAIN: &[Extractor] = &[from_og_title, from_title_tag];

pub fn extract(article: &Article) -> String {
    first_of(CHAIN, article).unwrap_or_else(|| UNTITLED.to_string())
}

fn from_og_title(article: &Article) -> Option<String> {
    article.meta_property("og:title")
}

fn from_title_tag(article: &Article) -> Option<String> {
    article.first_text(&TITLE_SEL)
}
