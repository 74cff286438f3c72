/// Tables Linter — checks a heuristic tables file for rules that can never
/// fire and other authoring mistakes.
///
/// Usage: tables_linter <tables.ron>

use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;
use story_ingest::core::matching::{contains_keyword, normalize};
use story_ingest::core::tables::{HeuristicTables, MAX_TAGS};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: tables_linter <tables.ron>");
        process::exit(0);
    }

    let tables = match HeuristicTables::load_from_ron(Path::new(&args[1])) {
        Ok(tables) => tables,
        Err(e) => {
            eprintln!("ERROR: Failed to load tables file: {}", e);
            process::exit(1);
        }
    };

    let (errors, warnings) = lint_tables(&tables);

    println!("\n=== Tables Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn lint_tables(tables: &HeuristicTables) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut keyword_sets: Vec<(String, &[String])> = Vec::new();
    for rule in &tables.emotions {
        keyword_sets.push((format!("emotion '{}'", rule.emotion.name()), &rule.keywords));
    }
    for rule in &tables.titles {
        keyword_sets.push((format!("title '{}'", rule.title), &rule.keywords));
    }
    for rule in &tables.genres {
        keyword_sets.push((format!("genre '{}'", rule.genre), &rule.keywords));
    }
    keyword_sets.push(("cliffhanger triggers".to_string(), &tables.cliffhanger_triggers));
    keyword_sets.push(("dramatic keywords".to_string(), &tables.dramatic_keywords));
    keyword_sets.push(("tag keywords".to_string(), &tables.tag_keywords));

    for (label, keywords) in &keyword_sets {
        if keywords.iter().all(|k| k.trim().is_empty()) {
            errors.push(format!("{} has no keywords", label));
            continue;
        }
        let mut seen = FxHashSet::default();
        for keyword in keywords.iter() {
            if !seen.insert(normalize(keyword)) {
                warnings.push(format!("{} lists '{}' more than once", label, keyword));
            }
        }
    }

    // A title rule is shadowed when each of its keywords already contains a
    // keyword of an earlier rule.
    for (i, rule) in tables.titles.iter().enumerate() {
        let earlier = &tables.titles[..i];
        let shadowed = !rule.keywords.is_empty()
            && rule.keywords.iter().all(|k| {
                let k = normalize(k);
                earlier
                    .iter()
                    .flat_map(|e| e.keywords.iter())
                    .any(|e| contains_keyword(&k, &normalize(e)))
            });
        if shadowed {
            warnings.push(format!(
                "title '{}' is shadowed by earlier title rules and can never be chosen",
                rule.title
            ));
        }
    }

    if !tables.genres.iter().any(|g| g.genre == tables.default_genre) {
        warnings.push(format!(
            "default genre '{}' is not in the genre table",
            tables.default_genre
        ));
    }

    if tables.name_pool.is_empty() {
        errors.push("name pool is empty; anonymization is impossible".to_string());
    }

    if tables.max_tags > MAX_TAGS {
        errors.push(format!(
            "max_tags is {}; stories carry at most {} tags",
            tables.max_tags, MAX_TAGS
        ));
    } else if tables.max_tags == 0 {
        warnings.push("max_tags is 0; derived tags will always be empty".to_string());
    }

    (errors, warnings)
}
