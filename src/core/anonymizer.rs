/// Deterministic sender anonymization.
///
/// Each distinct sender is mapped to a name from a fixed pool, picked by a
/// stable additive hash of the original name. The mapping only depends on
/// the document, so the same transcript always anonymizes the same way.
/// This is obfuscation for demos, not a privacy guarantee: the hash is a
/// plain code-unit sum and collisions are accepted.

use regex::{Captures, Regex};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::core::matching::is_word_char;
use crate::schema::message::Message;
use crate::schema::story::Character;

#[derive(Debug, Error)]
pub enum AnonymizerError {
    #[error("name pool is empty")]
    EmptyPool,
    #[error("name pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Sum of UTF-16 code units.
pub fn stable_hash(name: &str) -> u32 {
    name.encode_utf16()
        .fold(0u32, |acc, unit| acc.wrapping_add(u32::from(unit)))
}

/// Source name → substitute, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    entries: Vec<(String, String)>,
}

impl NameMap {
    pub fn substitute(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(source, _)| source == name)
            .map(|(_, substitute)| substitute.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Messages and declared characters after anonymization.
#[derive(Debug, Clone)]
pub struct Anonymized {
    pub messages: Vec<Message>,
    pub characters: Vec<Character>,
    pub names: NameMap,
}

#[derive(Debug, Clone, Copy)]
pub struct Anonymizer<'t> {
    pool: &'t [String],
}

impl<'t> Anonymizer<'t> {
    pub fn new(pool: &'t [String]) -> Self {
        Self { pool }
    }

    /// Build the substitution map for the distinct senders of `messages`.
    ///
    /// A pool entry that equals one of the document's own names is passed
    /// over for the next one, so no original name survives as a substitute.
    pub fn build_map(&self, messages: &[Message]) -> Result<NameMap, AnonymizerError> {
        if self.pool.is_empty() {
            return Err(AnonymizerError::EmptyPool);
        }

        let mut senders: Vec<&str> = Vec::new();
        for msg in messages {
            if !senders.contains(&msg.sender.as_str()) {
                senders.push(&msg.sender);
            }
        }
        let taken: FxHashSet<String> = senders.iter().map(|s| s.to_lowercase()).collect();

        let entries = senders
            .iter()
            .enumerate()
            .map(|(position, sender)| {
                let start = stable_hash(sender) as usize % self.pool.len();
                let substitute = (0..self.pool.len())
                    .map(|step| &self.pool[(start + step) % self.pool.len()])
                    .find(|candidate| !taken.contains(&candidate.to_lowercase()))
                    .cloned()
                    .unwrap_or_else(|| format!("Person {}", position + 1));
                (sender.to_string(), substitute)
            })
            .collect();

        Ok(NameMap { entries })
    }

    /// Rewrite every sender, every whole-word mention of a sender inside
    /// message text, and the names of matching declared characters.
    pub fn anonymize(
        &self,
        messages: Vec<Message>,
        characters: Vec<Character>,
    ) -> Result<Anonymized, AnonymizerError> {
        let names = self.build_map(&messages)?;
        if names.is_empty() {
            return Ok(Anonymized {
                messages,
                characters,
                names,
            });
        }

        let replacer = MentionReplacer::new(&names)?;

        let messages = messages
            .into_iter()
            .map(|mut msg| {
                if let Some(substitute) = names.substitute(&msg.sender) {
                    msg.sender = substitute.to_string();
                }
                msg.text = replacer.replace(&msg.text);
                msg
            })
            .collect();

        let characters = characters
            .into_iter()
            .map(|mut c| {
                if let Some(substitute) = names.substitute(&c.name) {
                    c.name = substitute.to_string();
                }
                c
            })
            .collect();

        Ok(Anonymized {
            messages,
            characters,
            names,
        })
    }
}

/// Replaces all mapped names in a single pass, so a substitute that
/// happens to be produced mid-string is never rewritten again. A mention
/// spelled exactly like a sender takes that sender's substitute; other
/// casings fall back to the first sender with the same lowercase name.
struct MentionReplacer {
    pattern: Regex,
    exact: FxHashMap<String, String>,
    folded: FxHashMap<String, String>,
}

impl MentionReplacer {
    fn new(names: &NameMap) -> Result<Self, AnonymizerError> {
        let mut sources: Vec<&str> = names.iter().map(|(s, _)| s).collect();
        // Longest first so "Mary Ann" wins over "Mary" at the same position.
        sources.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        let alternatives: Vec<String> = sources
            .iter()
            .map(|name| {
                let starts_word = name.chars().next().is_some_and(is_word_char);
                let ends_word = name.chars().next_back().is_some_and(is_word_char);
                format!(
                    "{}{}{}",
                    if starts_word { r"\b" } else { "" },
                    regex::escape(name),
                    if ends_word { r"\b" } else { "" },
                )
            })
            .collect();
        let pattern = Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?;

        let mut exact = FxHashMap::default();
        let mut folded = FxHashMap::default();
        for (source, substitute) in names.iter() {
            exact.insert(source.to_string(), substitute.to_string());
            folded
                .entry(source.to_lowercase())
                .or_insert_with(|| substitute.to_string());
        }

        Ok(Self {
            pattern,
            exact,
            folded,
        })
    }

    fn replace(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures| {
                let matched = &caps[0];
                self.exact
                    .get(matched)
                    .or_else(|| self.folded.get(&matched.to_lowercase()))
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}
