/// Heuristic message signals: emotion, cliffhanger, media, and drama.

use crate::core::matching::{contains_keyword, is_word_char, normalize};
use crate::core::tables::HeuristicTables;
use crate::schema::message::{Emotion, MediaType, Message, RawUtterance};

/// Everything the detector knows about one piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub emotion: Emotion,
    pub cliffhanger: bool,
    pub media: Option<MediaType>,
    /// Scoring-only; never stored on a message.
    pub dramatic: bool,
}

/// Explicit values an author attached to an utterance. They win over
/// the heuristics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalOverrides {
    pub emotion: Option<Emotion>,
    pub cliffhanger: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
pub struct SignalDetector<'t> {
    tables: &'t HeuristicTables,
}

impl<'t> SignalDetector<'t> {
    pub fn new(tables: &'t HeuristicTables) -> Self {
        Self { tables }
    }

    pub fn analyze(&self, text: &str) -> Signals {
        let normalized = normalize(text);
        Signals {
            emotion: self.emotion_of(&normalized),
            cliffhanger: self.cliffhanger_of(&normalized),
            media: self.media_of(&normalized),
            dramatic: self.dramatic_of(text, &normalized),
        }
    }

    /// First emotion whose keywords occur; neutral otherwise.
    pub fn emotion(&self, text: &str) -> Emotion {
        self.emotion_of(&normalize(text))
    }

    pub fn is_cliffhanger(&self, text: &str) -> bool {
        self.cliffhanger_of(&normalize(text))
    }

    /// Attachment kind, if the text carries a platform placeholder.
    pub fn media_type(&self, text: &str) -> Option<MediaType> {
        self.media_of(&normalize(text))
    }

    pub fn is_dramatic(&self, text: &str) -> bool {
        self.dramatic_of(text, &normalize(text))
    }

    /// Turn an utterance into the message at position `id`.
    pub fn classify(&self, id: u32, utterance: RawUtterance, overrides: SignalOverrides) -> Message {
        let signals = self.analyze(&utterance.text);
        Message {
            id,
            sender: utterance.sender,
            timestamp_raw: utterance.timestamp_raw,
            text: utterance.text,
            emotion: overrides.emotion.unwrap_or(signals.emotion),
            is_cliffhanger: overrides.cliffhanger.unwrap_or(signals.cliffhanger),
            has_media: signals.media.is_some(),
            media_type: signals.media,
            delay_ms: None,
        }
    }

    /// Classify a sequence of utterances, numbering messages from 1 in
    /// source order.
    pub fn classify_all<I>(&self, utterances: I) -> Vec<Message>
    where
        I: IntoIterator<Item = (RawUtterance, SignalOverrides)>,
    {
        utterances
            .into_iter()
            .enumerate()
            .map(|(i, (utterance, overrides))| self.classify(i as u32 + 1, utterance, overrides))
            .collect()
    }

    fn emotion_of(&self, normalized: &str) -> Emotion {
        self.tables
            .emotions
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| contains_keyword(normalized, k)))
            .map(|rule| rule.emotion)
            .unwrap_or_default()
    }

    fn cliffhanger_of(&self, normalized: &str) -> bool {
        let trigger = self
            .tables
            .cliffhanger_triggers
            .iter()
            .any(|t| contains_keyword(normalized, t));
        let ellipsis = normalized.contains("...") || normalized.contains('\u{2026}');
        trigger || ellipsis || self.interrogative_ending(normalized)
    }

    /// "guess what?", "you know who?!": a question word right before a
    /// closing run of `?`/`!` that contains at least one `?`.
    fn interrogative_ending(&self, normalized: &str) -> bool {
        let trimmed = normalized.trim_end();
        let body = trimmed.trim_end_matches(['?', '!']);
        let closing = &trimmed[body.len()..];
        if !closing.contains('?') {
            return false;
        }

        let word_start = body
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_word_char(*c))
            .last()
            .map(|(i, _)| i);
        let Some(start) = word_start else {
            return false;
        };
        let last_word = &body[start..];
        self.tables.interrogatives.iter().any(|w| w == last_word)
    }

    fn media_of(&self, normalized: &str) -> Option<MediaType> {
        self.tables
            .media_tokens
            .iter()
            .find(|m| normalized.contains(&normalize(&m.token)))
            .map(|m| m.media_type)
    }

    fn dramatic_of(&self, original: &str, normalized: &str) -> bool {
        let drama = &self.tables.drama;

        if self
            .tables
            .dramatic_keywords
            .iter()
            .any(|k| contains_keyword(normalized, k))
        {
            return true;
        }

        let exclamations = original.matches('!').count();
        let questions = original.matches('?').count();
        if exclamations >= drama.exclamations || questions >= drama.questions {
            return true;
        }

        let letters = original.chars().filter(|c| c.is_alphabetic()).count();
        if letters < drama.min_letters.max(1) {
            return false;
        }
        let upper = original.chars().filter(|c| c.is_uppercase()).count();
        upper as f32 / letters as f32 > drama.uppercase_ratio
    }
}
