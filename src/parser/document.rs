use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static CONTAINER_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["div#js_content", "div.rich_media_content"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static META_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());

/// A parsed article page plus the lookups the extractors share.
pub struct Article {
    html: Html,
}

impl Article {
    pub fn parse(source: &str) -> Self {
        Article {
            html: Html::parse_document(source),
        }
    }

    /// `content` of the first `<meta property=...>` with this property.
    pub fn meta_property(&self, property: &str) -> Option<String> {
        self.meta_content("property", property)
    }

    /// `content` of the first `<meta name=...>` with this name.
    pub fn meta_name(&self, name: &str) -> Option<String> {
        self.meta_content("name", name)
    }

    fn meta_content(&self, attr: &str, value: &str) -> Option<String> {
        self.html
            .select(&META_SEL)
            .find(|m| m.value().attr(attr) == Some(value))
            .map(|m| m.value().attr("content").unwrap_or("").trim().to_string())
    }

    /// Text of the first element matching `selector`, each text node
    /// trimmed and the pieces concatenated with nothing between them.
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.html
            .select(selector)
            .next()
            .map(|el| el.text().map(str::trim).collect::<String>())
    }

    /// Article body: `#js_content`, falling back to `.rich_media_content`.
    pub fn content(&self) -> Option<ElementRef<'_>> {
        CONTAINER_SELECTORS
            .iter()
            .find_map(|sel| self.html.select(sel).next())
    }
}

/// Text nodes under `container`, each trimmed, joined by newlines.
/// Script, style and noscript bodies are not prose and are left out.
pub fn container_text(container: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in container.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_code = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
        if in_code {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    parts.join("\n")
}
