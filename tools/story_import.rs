/// Story Import — run a transcript or script through the importer.
///
/// Usage:
///   story_import chat.txt --format chat-export --anonymize
///   cat script.txt | story_import --format directive-text --json
///   story_import stories.json --format json-stories --all --json

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use story_ingest::core::pipeline::{FormatHint, ImportOptions, ImportReport, Importer};
use story_ingest::core::scorer::ViralScorer;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "story_import")]
#[command(about = "Import a chat export, directive script, or JSON story file")]
struct Args {
    /// Input file (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Input format: directive-text, chat-export, or json-stories
    #[arg(short, long, default_value = "chat-export")]
    format: String,

    /// Replace sender names with names from the pool
    #[arg(long)]
    anonymize: bool,

    /// RON file overriding the built-in heuristic tables
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Import every story of a json-stories document
    #[arg(long)]
    all: bool,

    /// Print the story as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let text = read_input(args.input.as_ref())?;

    let mut builder = Importer::builder();
    if let Some(path) = &args.tables {
        builder = builder.tables_path(path);
    }
    let importer = builder.build().context("failed to build importer")?;

    let options = ImportOptions {
        anonymize: args.anonymize,
        ..ImportOptions::default()
    };
    let format: FormatHint = args.format.parse()?;

    let reports = if args.all && format == FormatHint::JsonStories {
        importer.run_json_stories(&text, options)?
    } else {
        vec![importer.run(&text, format, options)?]
    };

    for report in &reports {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report.story)?);
        } else {
            print_summary(&importer, report);
        }
    }
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn print_summary(importer: &Importer, report: &ImportReport) {
    let story = &report.story;
    println!("=== {} ===", story.title);
    println!("Genre:    {}", story.genre);
    println!("Source:   {}", story.source.name());
    println!("Tags:     {}", story.tags.join(", "));
    println!(
        "Cast:     {}",
        story
            .characters
            .iter()
            .map(|c| match &c.role {
                Some(role) => format!("{} ({})", c.name, role),
                None => c.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Messages: {} ({} lines skipped)", story.messages.len(), report.skipped_lines);

    let b = ViralScorer::new(importer.tables()).breakdown(&story.messages);
    println!(
        "Score:    {} (base {:.0} + length {:.1} + drama {:.1} + variety {:.1} + cliffhangers {:.1} + media {:.1})",
        b.total, b.base, b.length, b.drama_density, b.emotion_variety, b.cliffhangers, b.media
    );
    println!();

    for msg in &story.messages {
        let mut flags = Vec::new();
        if msg.emotion != Default::default() {
            flags.push(msg.emotion.name().to_string());
        }
        if msg.is_cliffhanger {
            flags.push("cliffhanger".to_string());
        }
        if let Some(media) = msg.media_type {
            flags.push(format!("{media:?}").to_lowercase());
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", flags.join(", "))
        };
        println!("{:>3}. {}: {}{}", msg.id, msg.sender, msg.text, flags);
    }
}
