use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Provisional story id. The persistence layer assigns the durable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(pub Uuid);

impl StoryId {
    pub fn new_provisional() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A speaker in the story roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Character {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            avatar: None,
        }
    }
}

/// Where a story's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorySource {
    Manual,
    ChatExport,
    Forum,
    Template,
}

impl StorySource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::ChatExport => "chat-export",
            Self::Forum => "forum",
            Self::Template => "template",
        }
    }

    /// Everything except hand-authored scripts counts as imported content.
    pub fn is_imported(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

/// The finished, normalized story record.
///
/// Stories are produced whole by the importer; there is no API for
/// patching one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub genre: String,
    pub characters: Vec<Character>,
    pub messages: Vec<Message>,
    pub estimated_viral_score: u8,
    pub source: StorySource,
    pub tags: Vec<String>,
    pub is_imported: bool,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Returns true if `other` carries the same content, ignoring the
    /// provisional id and creation time.
    pub fn same_content(&self, other: &Story) -> bool {
        self.title == other.title
            && self.genre == other.genre
            && self.characters == other.characters
            && self.messages == other.messages
            && self.estimated_viral_score == other.estimated_viral_score
            && self.source == other.source
            && self.tags == other.tags
            && self.is_imported == other.is_imported
    }
}
