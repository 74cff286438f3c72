//! WASM bindings for story-ingest — powers the browser import preview.

use wasm_bindgen::prelude::*;

use story_ingest::core::pipeline::{ImportOptions, Importer};
use story_ingest::core::scorer::viral_score;
use story_ingest::schema::message::Message;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct ImportOutput<'a> {
    story: &'a story_ingest::schema::story::Story,
    skipped_lines: usize,
}

fn importer() -> Result<Importer, JsError> {
    Importer::builder()
        .build()
        .map_err(|e| JsError::new(&format!("Importer build error: {e}")))
}

fn parse_options(options_json: &str) -> Result<ImportOptions, JsError> {
    if options_json.trim().is_empty() {
        return Ok(ImportOptions::default());
    }
    serde_json::from_str(options_json)
        .map_err(|e| JsError::new(&format!("Invalid options JSON: {e}")))
}

/// Import `text` and return `{ "story": ..., "skipped_lines": n }` as JSON.
///
/// `format` is one of `directive-text`, `chat-export`, `json-stories`.
/// `options_json` may be empty or e.g. `{"anonymize": true}`.
#[wasm_bindgen]
pub fn import_story(text: &str, format: &str, options_json: &str) -> Result<String, JsError> {
    let options = parse_options(options_json)?;
    let report = importer()?
        .run_named(text, format, options)
        .map_err(|e| JsError::new(&format!("{}: {e}", e.reason_code())))?;
    serde_json::to_string(&ImportOutput {
        story: &report.story,
        skipped_lines: report.skipped_lines,
    })
    .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

/// Score a JSON array of messages, as produced by `import_story`.
#[wasm_bindgen]
pub fn score_messages(messages_json: &str) -> Result<u8, JsError> {
    let messages: Vec<Message> = serde_json::from_str(messages_json)
        .map_err(|e| JsError::new(&format!("Invalid messages JSON: {e}")))?;
    Ok(viral_score(&messages))
}

/// Return JSON array of supported input formats.
#[wasm_bindgen]
pub fn formats() -> String {
    serde_json::to_string(&["directive-text", "chat-export", "json-stories"])
        .unwrap_or_else(|_| "[]".to_string())
}
