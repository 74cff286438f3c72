use serde::{Deserialize, Serialize};

/// The closed emotion vocabulary attached to every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Sad,
    Shocked,
    Happy,
    Scared,
    Betrayed,
    Neutral,
}

impl Default for Emotion {
    fn default() -> Self {
        Self::Neutral
    }
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Self::Angry,
        Self::Sad,
        Self::Shocked,
        Self::Happy,
        Self::Scared,
        Self::Betrayed,
        Self::Neutral,
    ];

    /// Lowercase name, as used in directive scripts and JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Sad => "sad",
            Self::Shocked => "shocked",
            Self::Happy => "happy",
            Self::Scared => "scared",
            Self::Betrayed => "betrayed",
            Self::Neutral => "neutral",
        }
    }

    /// Case-insensitive lookup by name. Returns `None` outside the vocabulary.
    pub fn parse(s: &str) -> Option<Emotion> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(wanted))
    }
}

/// Kind of attachment a platform placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Sticker,
    Gif,
    Document,
    /// Generic "media omitted" placeholder with no kind information.
    Unknown,
}

/// One line of dialogue before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUtterance {
    pub sender: String,
    pub timestamp_raw: Option<String>,
    pub text: String,
}

impl RawUtterance {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            timestamp_raw: None,
            text: text.into(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp_raw = Some(timestamp.into());
        self
    }
}

/// A classified message. Created once by the signal detector (or the
/// structured JSON path) and rewritten at most once by the anonymizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 1-based position in source order.
    pub id: u32,
    pub sender: String,
    pub timestamp_raw: Option<String>,
    pub text: String,
    pub emotion: Emotion,
    pub is_cliffhanger: bool,
    pub has_media: bool,
    pub media_type: Option<MediaType>,
    /// Typing delay before the message is shown, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u32>,
}
