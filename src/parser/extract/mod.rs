pub mod author;
pub mod cover;
pub mod description;
pub mod title;

use super::document::Article;

/// One step of a field's fallback chain.
pub type Extractor = fn(&Article) -> Option<String>;

/// Run extractors in order; the first non-empty value wins.
pub fn first_of(chain: &[Extractor], article: &Article) -> Option<String> {
    chain
        .iter()
        .find_map(|f| f(article).filter(|v| !v.is_empty()))
}

pub struct ExtractedFields {
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_url: Option<String>,
}

pub fn extract_all(article: &Article, body: &str) -> ExtractedFields {
    ExtractedFields {
        title: title::extract(article),
        author: author::extract(article, body),
        description: description::extract(article),
        cover_url: cover::extract(article),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &Article) -> Option<String> {
        None
    }
    fn empty(_: &Article) -> Option<String> {
        Some(String::new())
    }
    fn a(_: &Article) -> Option<String> {
        Some("a".into())
    }
    fn b(_: &Article) -> Option<String> {
        Some("b".into())
    }

    #[test]
    fn first_success_wins() {
        let doc = Article::parse("");
        let chain: &[Extractor] = &[none, empty, a, b];
        assert_eq!(first_of(chain, &doc).as_deref(), Some("a"));
        let chain: &[Extractor] = &[b, a];
        assert_eq!(first_of(chain, &doc).as_deref(), Some("b"));
        let chain: &[Extractor] = &[none, empty];
        assert_eq!(first_of(chain, &doc), None);
        assert_eq!(first_of(&[], &doc), None);
    }

    #[test]
    fn fixture_fields() {
        let html = std::fs::read_to_string("tests/fixtures/article.html").unwrap();
        let doc = Article::parse(&html);
        let body = crate::parser::text::clean_for_tts(&crate::parser::document::container_text(
            doc.content().unwrap(),
        ));
        let f = extract_all(&doc, &body);
        assert_eq!(f.title, "在城市边缘种一棵树");
        assert_eq!(f.author, "林间");
        assert_eq!(f.description, "关于搬家、阳台和一棵柠檬树的小事。");
        assert_eq!(
            f.cover_url.as_deref(),
            Some("https://mmbiz.qpic.cn/mmbiz_jpg/lemon/640?wx_fmt=jpeg")
        );
    }
}
