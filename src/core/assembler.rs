/// Story assembly — title, genre, tags, and roster from finished messages.

use chrono::Utc;

use crate::core::matching::{contains_keyword, count_keyword, normalize};
use crate::core::tables::{HeuristicTables, MAX_TAGS};
use crate::schema::message::Message;
use crate::schema::story::{Character, Story, StoryId, StorySource};

/// Values the source declared explicitly. Anything present here wins over
/// the table lookups.
#[derive(Debug, Clone, Default)]
pub struct AssemblyHints {
    pub title: Option<String>,
    pub genre: Option<String>,
    /// Explicit tags. An empty list counts as "not given".
    pub tags: Vec<String>,
    /// Declared characters; only used for their role and avatar.
    pub characters: Vec<Character>,
}

/// Classification of a message sequence, ready to become a [`Story`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub title: String,
    pub genre: String,
    pub tags: Vec<String>,
    pub characters: Vec<Character>,
}

impl Assembled {
    /// Build the story in one step. This is the only place stories are made.
    pub fn into_story(self, messages: Vec<Message>, score: u8, source: StorySource) -> Story {
        Story {
            id: StoryId::new_provisional(),
            title: self.title,
            genre: self.genre,
            characters: self.characters,
            messages,
            estimated_viral_score: score,
            source,
            tags: self.tags,
            is_imported: source.is_imported(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StoryAssembler<'t> {
    tables: &'t HeuristicTables,
}

impl<'t> StoryAssembler<'t> {
    pub fn new(tables: &'t HeuristicTables) -> Self {
        Self { tables }
    }

    pub fn assemble(&self, messages: &[Message], hints: &AssemblyHints) -> Assembled {
        let corpus = corpus(messages);

        let title = hints
            .title
            .clone()
            .unwrap_or_else(|| self.title(&corpus));
        let genre = hints
            .genre
            .clone()
            .unwrap_or_else(|| self.genre(&corpus));
        let tags = if hints.tags.is_empty() {
            self.tags(&corpus)
        } else {
            hints
                .tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .take(self.tag_limit())
                .collect()
        };

        Assembled {
            title,
            genre,
            tags,
            characters: roster(messages, &hints.characters),
        }
    }

    fn tag_limit(&self) -> usize {
        self.tables.max_tags.min(MAX_TAGS)
    }

    /// First title rule with any keyword in the corpus.
    pub fn title(&self, corpus: &str) -> String {
        self.tables
            .titles
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| contains_keyword(corpus, k)))
            .map(|rule| rule.title.clone())
            .unwrap_or_else(|| self.tables.fallback_title.clone())
    }

    /// Genre with the most keyword occurrences; earlier genres win ties.
    pub fn genre(&self, corpus: &str) -> String {
        let mut best: Option<(&str, usize)> = None;
        for rule in &self.tables.genres {
            let hits: usize = rule.keywords.iter().map(|k| count_keyword(corpus, k)).sum();
            if hits > best.map_or(0, |(_, n)| n) {
                best = Some((&rule.genre, hits));
            }
        }
        best.map(|(genre, _)| genre.to_string())
            .unwrap_or_else(|| self.tables.default_genre.clone())
    }

    /// Tag keywords present in the corpus, in table order, capped.
    pub fn tags(&self, corpus: &str) -> Vec<String> {
        self.tables
            .tag_keywords
            .iter()
            .filter(|k| contains_keyword(corpus, k))
            .take(self.tag_limit())
            .cloned()
            .collect()
    }
}

/// Normalized text of every message, one per line.
pub fn corpus(messages: &[Message]) -> String {
    let joined = messages
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    normalize(&joined)
}

/// Distinct senders in first-appearance order, with role and avatar from
/// a declared character of the same name.
pub fn roster(messages: &[Message], declared: &[Character]) -> Vec<Character> {
    let mut characters: Vec<Character> = Vec::new();
    for msg in messages {
        if characters.iter().any(|c| c.name == msg.sender) {
            continue;
        }
        let character = declared
            .iter()
            .find(|c| c.name == msg.sender)
            .cloned()
            .unwrap_or_else(|| Character::named(msg.sender.clone()));
        characters.push(character);
    }
    characters
}
