mod audio;
mod catalog;
mod config;
mod covers;
mod error;
mod parser;
mod voice;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::catalog::{Catalog, Layout};
use crate::config::Settings;
use crate::parser::ParsedEpisode;

#[derive(Parser)]
#[command(name = "serendipity_fm", about = "Turn saved article pages into a narrated podcast catalog")]
struct Cli {
    /// Settings file (default: ./serendipity.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract episodes from saved HTML pages and merge them into the catalog
    Parse {
        /// Directory holding the *.html pages (overrides source_dir)
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// Do not download cover images
        #[arg(long)]
        no_covers: bool,
    },
    /// Repair author names that were rendered twice ("李雷李雷")
    FixAuthors,
    /// Generate audio for catalog episodes and record durations
    Synthesize {
        /// Max episodes to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Catalog overview table
    List {
        /// Filter by voice (e.g. zh-CN-YunxiNeural)
        #[arg(short, long)]
        voice: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show catalog statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let layout = Layout::new(&settings.output_dir);

    let result = match cli.command {
        Commands::Parse { source, no_covers } => {
            let source_dir = source.unwrap_or_else(|| settings.source_dir.clone());
            let files = html_files(&source_dir)?;
            if files.is_empty() {
                println!("No HTML files found in {}", source_dir.display());
                return Ok(());
            }
            println!("Found {} HTML files in {}", files.len(), source_dir.display());

            let mut parsed = parse_files(&files, &settings.source_label);
            if parsed.is_empty() {
                println!("No articles parsed successfully.");
                return Ok(());
            }

            if no_covers {
                covers::skip_covers(&mut parsed, &layout);
            } else {
                let client = covers::client(&settings)?;
                let stats =
                    covers::download_covers(&client, &layout, &mut parsed, settings.download_retries)
                        .await;
                println!(
                    "Covers: {} downloaded, {} cached, {} failed",
                    stats.ok, stats.cached, stats.failed
                );
            }

            for p in &parsed {
                let ep = &p.episode;
                println!(
                    "  {} | {} | {} | {} | {} chars",
                    ep.id,
                    truncate(&ep.title, 24),
                    ep.author,
                    ep.voice,
                    p.text_content.chars().count()
                );
            }

            let count = parsed.len();
            let stats = catalog::save_episodes(&layout, parsed)?;
            println!(
                "Parsed {} articles ({} new, {} updated) -> {}",
                count,
                stats.added,
                stats.replaced,
                layout.catalog_file().display()
            );
            println!("Next: run 'synthesize' to generate audio.");
            Ok(())
        }
        Commands::FixAuthors => {
            let fixes = catalog::fix_authors_in_place(&layout)?;
            for f in &fixes {
                println!("Fixed {}: {} -> {}", f.id, f.old, f.new);
            }
            println!("{} author names repaired.", fixes.len());
            Ok(())
        }
        Commands::Synthesize { limit } => {
            let catalog_file = layout.catalog_file();
            let mut catalog = Catalog::load(&catalog_file)
                .context("No catalog to synthesize; run 'parse' first")?;
            if catalog.episodes.is_empty() {
                println!("Catalog has no episodes.");
                return Ok(());
            }
            let tts = audio::EdgeTts::new(settings.tts_command.clone());
            let stats = audio::synthesize_catalog(&tts, &layout, &mut catalog, limit).await;
            catalog.save(&catalog_file)?;
            println!("Synthesized {}/{} episodes.", stats.succeeded, stats.total);
            Ok(())
        }
        Commands::List { voice, limit } => {
            let catalog = Catalog::load(&layout.catalog_file())?;
            let rows: Vec<_> = catalog
                .episodes
                .iter()
                .filter(|e| voice.as_deref().map_or(true, |v| e.voice == v))
                .take(limit)
                .collect();
            if rows.is_empty() {
                println!("No episodes found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<8} | {:<24} | {:<12} | {:<20} | {:>5} | {:<5}",
                "#", "Id", "Title", "Author", "Voice", "Len", "Cover"
            );
            println!("{}", "-".repeat(96));
            for (i, e) in rows.iter().enumerate() {
                let len = if e.duration > 0 {
                    format!("{}:{:02}", e.duration / 60, e.duration % 60)
                } else {
                    "-".into()
                };
                println!(
                    "{:>3} | {:<8} | {:<24} | {:<12} | {:<20} | {:>5} | {:<5}",
                    i + 1,
                    e.id,
                    truncate(&e.title, 24),
                    truncate(&e.author, 12),
                    e.voice,
                    len,
                    if e.cover_file.is_some() { "yes" } else { "-" }
                );
            }
            println!("\n{} episodes", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let catalog = Catalog::load(&layout.catalog_file())?;
            let eps = &catalog.episodes;
            let total_secs: u64 = eps.iter().map(|e| e.duration).sum();
            println!("Episodes:   {}", eps.len());
            println!("With cover: {}", eps.iter().filter(|e| e.cover_file.is_some()).count());
            println!("With audio: {}", eps.iter().filter(|e| e.duration > 0).count());
            println!("Total time: {}", format_duration(std::time::Duration::from_secs(total_secs)));
            let mut by_voice: BTreeMap<&str, usize> = BTreeMap::new();
            for e in eps {
                *by_voice.entry(e.voice.as_str()).or_default() += 1;
            }
            println!("\n--- Voices ---");
            for (v, n) in by_voice {
                println!("  {:<22} {}", v, n);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// `*.html` files directly under `dir`, in file-name order.
fn html_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Cannot list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// One document at a time; a bad document is logged and skipped.
fn parse_files(files: &[PathBuf], source_label: &str) -> Vec<ParsedEpisode> {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut parsed = Vec::with_capacity(files.len());
    let mut skipped = 0usize;
    for path in files {
        match parser::process_document(path, source_label) {
            Ok(p) => parsed.push(p),
            Err(reason) => {
                warn!("Skipping {}: {}", path.display(), reason);
                skipped += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if skipped > 0 {
        println!("Skipped {} of {} documents (see warnings).", skipped, files.len());
    }
    parsed
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
