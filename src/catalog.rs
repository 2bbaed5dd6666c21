use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::parser::extract::author::repair_duplicated;
use crate::parser::ParsedEpisode;

/// One catalog entry. Body text lives in `data/texts/<id>.txt`, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub author: String,
    pub source: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub voice: String,
    pub source_file: String,
    pub audio_file: String,
    #[serde(default)]
    pub cover_file: Option<String>,
    #[serde(default)]
    pub duration: u64,
    /// Keys this tool doesn't model; carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub episodes: Vec<Episode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn audio_path(id: &str) -> String {
    format!("audio/{}.mp3", id)
}

pub fn cover_path(id: &str) -> String {
    format!("covers/{}.jpg", id)
}

/// Where artifacts live under the output directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Layout { root: root.into() }
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.root.join("data").join("episodes.json")
    }

    pub fn text_file(&self, id: &str) -> PathBuf {
        self.root.join("data").join("texts").join(format!("{}.txt", id))
    }

    /// Resolve a catalog-relative path such as `audio/<id>.mp3`.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

// ── Catalog file ──

impl Catalog {
    pub fn load(path: &Path) -> Result<Catalog> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed catalog {}", path.display()))
    }

    /// Missing file means an empty catalog; a malformed one is still an error.
    pub fn load_or_default(path: &Path) -> Result<Catalog> {
        if path.exists() {
            Catalog::load(path)
        } else {
            Ok(Catalog::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_pretty(path, self)
    }

    /// Insert or replace by id. Replaced entries keep their slot, the
    /// duration already probed for their audio, and any unmodelled keys.
    pub fn merge(&mut self, incoming: Vec<Episode>) -> MergeStats {
        let mut index: HashMap<String, usize> = self
            .episodes
            .iter()
            .enumerate()
            .map(|(i, ep)| (ep.id.clone(), i))
            .collect();
        let mut stats = MergeStats::default();

        for mut ep in incoming {
            match index.get(&ep.id) {
                Some(&i) => {
                    let old = std::mem::take(&mut self.episodes[i].extra);
                    for (key, value) in old {
                        ep.extra.entry(key).or_insert(value);
                    }
                    ep.duration = self.episodes[i].duration;
                    self.episodes[i] = ep;
                    stats.replaced += 1;
                }
                None => {
                    index.insert(ep.id.clone(), self.episodes.len());
                    self.episodes.push(ep);
                    stats.added += 1;
                }
            }
        }
        stats
    }
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write catalog {}", path.display()))?;
    Ok(())
}

/// Undo doubled author names in a raw catalog document. Only `author`
/// values change; records this tool can't otherwise read are still fixed.
pub fn fix_authors(doc: &mut Value) -> Result<Vec<AuthorFix>> {
    let episodes = doc
        .get_mut("episodes")
        .and_then(Value::as_array_mut)
        .context("Catalog has no \"episodes\" list")?;

    let mut fixes = Vec::new();
    for record in episodes.iter_mut() {
        let Some(obj) = record.as_object_mut() else {
            continue;
        };
        let Some(author) = obj.get("author").and_then(Value::as_str) else {
            continue;
        };
        let repaired = repair_duplicated(author);
        if repaired == author {
            continue;
        }
        let fix = AuthorFix {
            id: obj.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
            old: author.to_string(),
            new: repaired.to_string(),
        };
        obj.insert("author".to_string(), Value::String(fix.new.clone()));
        fixes.push(fix);
    }
    Ok(fixes)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub replaced: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorFix {
    pub id: String,
    pub old: String,
    pub new: String,
}

// ── Passes ──

/// Write each body to its text file, then fold the metadata into the catalog.
pub fn save_episodes(layout: &Layout, parsed: Vec<ParsedEpisode>) -> Result<MergeStats> {
    let mut incoming = Vec::with_capacity(parsed.len());
    for p in parsed {
        let path = layout.text_file(&p.episode.id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, &p.text_content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("wrote {}", path.display());
        incoming.push(p.episode);
    }

    let catalog_file = layout.catalog_file();
    let mut catalog = Catalog::load_or_default(&catalog_file)?;
    let stats = catalog.merge(incoming);
    catalog.save(&catalog_file)?;
    info!(
        "Catalog {}: {} added, {} replaced, {} total",
        catalog_file.display(),
        stats.added,
        stats.replaced,
        catalog.episodes.len()
    );
    Ok(stats)
}

/// Maintenance pass over an existing catalog. A missing catalog is an error.
pub fn fix_authors_in_place(layout: &Layout) -> Result<Vec<AuthorFix>> {
    let catalog_file = layout.catalog_file();
    let raw = std::fs::read_to_string(&catalog_file)
        .with_context(|| format!("Failed to read catalog {}", catalog_file.display()))?;
    let mut doc: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed catalog {}", catalog_file.display()))?;
    let fixes = fix_authors(&mut doc)?;
    write_pretty(&catalog_file, &doc)?;
    Ok(fixes)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::build_episode;

    fn ep(id: &str, author: &str) -> Episode {
        Episode {
            id: id.to_string(),
            title: format!("title {}", id),
            author: author.to_string(),
            source: "每日豆瓣".to_string(),
            quote: String::new(),
            description: String::new(),
            cover_url: None,
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            source_file: format!("{}.html", id),
            audio_file: audio_path(id),
            cover_file: None,
            duration: 0,
            extra: Default::default(),
        }
    }

    fn parsed_fixtures() -> Vec<ParsedEpisode> {
        ["article", "doubled_byline"]
            .iter()
            .map(|name| {
                let html =
                    std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
                build_episode(&html, &format!("{}.html", name), "每日豆瓣").unwrap()
            })
            .collect()
    }

    #[test]
    fn json_shape() {
        let catalog = Catalog {
            episodes: vec![ep("0a1b2c3d", "李雷")],
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&catalog).unwrap();
        assert!(json.starts_with("{\n  \"episodes\": [\n    {\n      \"id\": \"0a1b2c3d\""));
        assert!(json.contains("\"author\": \"李雷\""), "non-ASCII must not be escaped");
        assert!(json.contains("\"cover_url\": null"));
        assert!(json.contains("\"duration\": 0"));
        assert!(!json.contains("text_content"));
    }

    #[test]
    fn loads_catalog_without_duration() {
        let raw = r#"{"episodes":[{"id":"1","title":"t","author":"a","source":"s",
            "voice":"v","source_file":"f.html","audio_file":"audio/1.mp3","cover_url":null}]}"#;
        let c: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(c.episodes[0].duration, 0);
        assert_eq!(c.episodes[0].cover_file, None);
    }

    #[test]
    fn merge_appends_and_replaces_in_place() {
        let mut c = Catalog {
            episodes: vec![ep("a", "x"), ep("b", "y")],
            ..Default::default()
        };
        c.episodes[0].duration = 321;
        let mut newer_a = ep("a", "x2");
        newer_a.title = "fresh".into();
        let stats = c.merge(vec![ep("c", "z"), newer_a]);

        assert_eq!(stats, MergeStats { added: 1, replaced: 1 });
        let ids: Vec<_> = c.episodes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(c.episodes[0].title, "fresh");
        assert_eq!(c.episodes[0].author, "x2");
        assert_eq!(c.episodes[0].duration, 321);
    }

    #[test]
    fn merge_duplicate_ids_in_one_batch() {
        let mut c = Catalog::default();
        let stats = c.merge(vec![ep("a", "first"), ep("a", "second")]);
        assert_eq!(stats, MergeStats { added: 1, replaced: 1 });
        assert_eq!(c.episodes.len(), 1);
        assert_eq!(c.episodes[0].author, "second");
    }

    #[test]
    fn fix_authors_reports_changes_only() {
        let c = Catalog {
            episodes: vec![ep("a", "李雷李雷"), ep("b", "李雷明"), ep("c", "KK"), ep("d", "AnnAnn")],
            ..Default::default()
        };
        let mut doc = serde_json::to_value(&c).unwrap();
        let fixes = fix_authors(&mut doc).unwrap();
        assert_eq!(
            fixes,
            vec![
                AuthorFix { id: "a".into(), old: "李雷李雷".into(), new: "李雷".into() },
                AuthorFix { id: "d".into(), old: "AnnAnn".into(), new: "Ann".into() },
            ]
        );
        let authors: Vec<_> = doc["episodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["author"].as_str().unwrap())
            .collect();
        assert_eq!(authors, ["李雷", "李雷明", "KK", "Ann"]);
        assert!(fix_authors(&mut doc).unwrap().is_empty());
    }

    #[test]
    fn save_writes_texts_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let parsed = parsed_fixtures();
        let ids: Vec<String> = parsed.iter().map(|p| p.episode.id.clone()).collect();

        let stats = save_episodes(&layout, parsed).unwrap();
        assert_eq!(stats, MergeStats { added: 2, replaced: 0 });

        for id in &ids {
            let text = std::fs::read_to_string(layout.text_file(id)).unwrap();
            assert!(text.chars().count() >= 100);
        }
        let catalog = Catalog::load(&layout.catalog_file()).unwrap();
        let saved: Vec<_> = catalog.episodes.iter().map(|e| e.id.clone()).collect();
        assert_eq!(saved, ids);
        let raw = std::fs::read_to_string(layout.catalog_file()).unwrap();
        assert!(!raw.contains("搬到城市边缘"), "body text leaked into the catalog");
    }

    #[test]
    fn rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());

        save_episodes(&layout, parsed_fixtures()).unwrap();
        let first = std::fs::read(layout.catalog_file()).unwrap();

        let stats = save_episodes(&layout, parsed_fixtures()).unwrap();
        assert_eq!(stats, MergeStats { added: 0, replaced: 2 });
        let second = std::fs::read(layout.catalog_file()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fix_authors_in_place_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        Catalog {
            episodes: vec![ep("a", "韩梅梅韩梅梅")],
            ..Default::default()
        }
        .save(&layout.catalog_file())
        .unwrap();

        let fixes = fix_authors_in_place(&layout).unwrap();
        assert_eq!(fixes.len(), 1);
        let reloaded = Catalog::load(&layout.catalog_file()).unwrap();
        assert_eq!(reloaded.episodes[0].author, "韩梅梅");
    }

    #[test]
    fn fix_authors_keeps_unknown_keys_and_partial_records() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        let path = layout.catalog_file();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"podcast": "Serendipity FM", "episodes": [
                {"id": "a", "author": "李雷李雷", "published": "2024-05-01"},
                {"id": "b", "title": "t", "author": "韩梅梅"}
            ]}"#,
        )
        .unwrap();

        let fixes = fix_authors_in_place(&layout).unwrap();
        assert_eq!(fixes.len(), 1);

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["podcast"], "Serendipity FM");
        assert_eq!(doc["episodes"][0]["author"], "李雷");
        assert_eq!(doc["episodes"][0]["published"], "2024-05-01");
        assert_eq!(doc["episodes"][1]["title"], "t");
        let keys: Vec<_> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["podcast", "episodes"]);
    }

    #[test]
    fn fix_authors_rejects_document_without_episodes() {
        let mut doc = serde_json::json!({"items": []});
        assert!(fix_authors(&mut doc).is_err());
    }

    #[test]
    fn extra_keys_survive_load_merge_save() {
        let raw = r#"{"podcast":"Serendipity FM","episodes":[{"id":"a","title":"t","author":"x",
            "source":"s","voice":"v","source_file":"a.html","audio_file":"audio/a.mp3",
            "published":"2024-05-01"}]}"#;
        let mut c: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(c.extra["podcast"], "Serendipity FM");

        c.merge(vec![ep("a", "y")]);
        assert_eq!(c.episodes[0].author, "y");
        assert_eq!(c.episodes[0].extra["published"], "2024-05-01");

        let json = serde_json::to_string_pretty(&c).unwrap();
        assert!(json.contains("\"podcast\": \"Serendipity FM\""));
        assert!(json.contains("\"published\": \"2024-05-01\""));
    }

    #[test]
    fn fix_authors_needs_catalog() {
        let dir = tempfile::tempdir().unwrap();
        assert!(fix_authors_in_place(&Layout::new(dir.path())).is_err());
    }
}
