use super::{first_of, Extractor};
use crate::parser::document::Article;

const CHAIN: &[Extractor] = &[from_meta_description, from_og_description];

pub fn extract(article: &Article) -> String {
    first_of(CHAIN, article).unwrap_or_default()
}

fn from_meta_description(article: &Article) -> Option<String> {
    article.meta_name("description")
}

fn from_og_description(article: &Article) -> Option<String> {
    article.meta_property("og:description")
}
