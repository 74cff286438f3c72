/// Pre-structured `json-stories` documents — typed schema and validation.

use serde::Deserialize;
use thiserror::Error;

use super::message::{Emotion, Message};
use super::story::Character;

#[derive(Debug, Error)]
pub enum StructuredInputError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("story {story}: field '{field}' must not be empty")]
    EmptyField { story: usize, field: &'static str },
    #[error("story {story}, message {message}: field '{field}' must not be empty")]
    EmptyMessageField {
        story: usize,
        message: usize,
        field: &'static str,
    },
    #[error("story {story}, message {message}: unknown emotion '{name}'")]
    UnknownEmotion {
        story: usize,
        message: usize,
        name: String,
    },
}

// Wire shapes. Required fields have no serde default, so a missing one is
// rejected by the deserializer itself.

#[derive(Debug, Deserialize)]
struct JsonDocument {
    stories: Vec<JsonStory>,
}

#[derive(Debug, Deserialize)]
struct JsonStory {
    title: String,
    #[serde(default)]
    genre: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    characters: Option<Vec<JsonCharacter>>,
    messages: Vec<JsonMessage>,
}

#[derive(Debug, Deserialize)]
struct JsonCharacter {
    name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonMessage {
    sender: String,
    message: String,
    /// Milliseconds; fractional values are rounded.
    #[serde(default)]
    delay: Option<f64>,
    /// Matched case-insensitively against the emotion vocabulary.
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    cliffhanger: Option<bool>,
    /// Accepted for compatibility with exported templates; carries no
    /// meaning for classification or scoring.
    #[serde(default)]
    viral: Option<bool>,
}

/// A validated story from a `json-stories` document, ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredStory {
    pub title: String,
    pub genre: Option<String>,
    pub tags: Vec<String>,
    pub characters: Vec<Character>,
    pub messages: Vec<Message>,
}

/// Parse and validate a `{"stories": [...]}` document.
///
/// An empty `stories` array is valid here; deciding that it has no usable
/// content is the importer's call.
pub fn parse_json_stories(input: &str) -> Result<Vec<StructuredStory>, StructuredInputError> {
    let doc: JsonDocument = serde_json::from_str(input)?;
    doc.stories
        .into_iter()
        .enumerate()
        .map(|(index, story)| validate_story(index, story))
        .collect()
}

fn validate_story(index: usize, story: JsonStory) -> Result<StructuredStory, StructuredInputError> {
    let title = story.title.trim().to_string();
    if title.is_empty() {
        return Err(StructuredInputError::EmptyField {
            story: index,
            field: "title",
        });
    }
    if story.messages.is_empty() {
        return Err(StructuredInputError::EmptyField {
            story: index,
            field: "messages",
        });
    }

    let mut messages = Vec::with_capacity(story.messages.len());
    for (i, msg) in story.messages.into_iter().enumerate() {
        let sender = msg.sender.trim().to_string();
        if sender.is_empty() {
            return Err(StructuredInputError::EmptyMessageField {
                story: index,
                message: i,
                field: "sender",
            });
        }
        let text = msg.message.trim().to_string();
        if text.is_empty() {
            return Err(StructuredInputError::EmptyMessageField {
                story: index,
                message: i,
                field: "message",
            });
        }
        let emotion = match msg.emotion.as_deref().map(str::trim) {
            None | Some("") => Emotion::Neutral,
            Some(name) => Emotion::parse(name).ok_or_else(|| StructuredInputError::UnknownEmotion {
                story: index,
                message: i,
                name: name.to_string(),
            })?,
        };
        messages.push(Message {
            id: i as u32 + 1,
            sender,
            timestamp_raw: None,
            text,
            emotion,
            is_cliffhanger: msg.cliffhanger.unwrap_or(false),
            has_media: false,
            media_type: None,
            delay_ms: msg.delay.and_then(delay_ms),
        });
    }

    let characters = story
        .characters
        .unwrap_or_default()
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| Character {
            name: c.name.trim().to_string(),
            role: c.role,
            avatar: c.avatar,
        })
        .collect();

    let genre = story
        .genre
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty());

    Ok(StructuredStory {
        title,
        genre,
        tags: story.tags.unwrap_or_default(),
        characters,
        messages,
    })
}

/// Negative and non-finite delays are dropped.
fn delay_ms(delay: f64) -> Option<u32> {
    if delay.is_finite() && delay >= 0.0 {
        Some(delay.round().min(u32::MAX as f64) as u32)
    } else {
        None
    }
}
