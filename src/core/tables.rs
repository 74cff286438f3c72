/// Heuristic lookup tables — keyword lists, thresholds, and scoring weights.
///
/// Every table is an explicitly ordered list, so "first match wins" and
/// "ties go to the earlier entry" hold no matter how the tables were
/// loaded. The built-in set is shared process-wide and read-only; a RON
/// file can override any subset of fields.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::message::{Emotion, MediaType};

/// Upper bound on tags per story, whatever the tables say.
pub const MAX_TAGS: usize = 5;

#[derive(Debug, Error)]
pub enum TablesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid tables: {0}")]
    Invalid(String),
}

/// Keywords that tag a message with an emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRule {
    pub emotion: Emotion,
    pub keywords: Vec<String>,
}

/// A platform placeholder that stands in for an attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaToken {
    pub token: String,
    pub media_type: MediaType,
}

/// Title chosen when any of its keywords occurs in the story text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRule {
    pub keywords: Vec<String>,
    pub title: String,
}

/// A genre and the keywords that vote for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRule {
    pub genre: String,
    pub keywords: Vec<String>,
}

/// Thresholds for the scoring-only "dramatic moment" flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DramaThresholds {
    /// Minimum number of `!` that counts as excessive.
    pub exclamations: usize,
    /// Minimum number of `?` that counts as excessive.
    pub questions: usize,
    /// Uppercase share of alphabetic letters above which a message shouts.
    pub uppercase_ratio: f32,
    /// Messages with fewer letters than this never count as shouting.
    pub min_letters: usize,
}

/// Weights and caps for the viral score. Each bonus is capped on its own
/// before the terms are summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub base: f32,
    pub per_message: f32,
    pub length_cap: f32,
    pub density_weight: f32,
    pub density_cap: f32,
    pub variety_weight: f32,
    pub variety_cap: f32,
    pub cliffhanger_weight: f32,
    pub cliffhanger_cap: f32,
    pub media_weight: f32,
    pub media_cap: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicTables {
    pub emotions: Vec<EmotionRule>,
    pub cliffhanger_triggers: Vec<String>,
    /// Question words that make a `?` ending a cliffhanger ("guess what?").
    pub interrogatives: Vec<String>,
    pub media_tokens: Vec<MediaToken>,
    pub dramatic_keywords: Vec<String>,
    pub drama: DramaThresholds,
    pub titles: Vec<TitleRule>,
    pub fallback_title: String,
    pub genres: Vec<GenreRule>,
    pub default_genre: String,
    pub tag_keywords: Vec<String>,
    pub max_tags: usize,
    pub name_pool: Vec<String>,
    pub scoring: ScoringWeights,
}

impl Default for HeuristicTables {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl HeuristicTables {
    /// The compiled-in tables.
    pub fn builtin() -> &'static HeuristicTables {
        &BUILTIN
    }

    /// Load tables from a RON file. Fields missing from the file keep
    /// their built-in values.
    pub fn load_from_ron(path: &Path) -> Result<HeuristicTables, TablesError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse tables from a RON string.
    pub fn parse_ron(input: &str) -> Result<HeuristicTables, TablesError> {
        Ok(ron::from_str(input)?)
    }

    /// Serialize to pretty RON, e.g. to seed an override file.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn emotion(emotion: Emotion, keywords: &[&str]) -> EmotionRule {
    EmotionRule {
        emotion,
        keywords: words(keywords),
    }
}

fn media(token: &str, media_type: MediaType) -> MediaToken {
    MediaToken {
        token: token.to_string(),
        media_type,
    }
}

fn title(keywords: &[&str], title: &str) -> TitleRule {
    TitleRule {
        keywords: words(keywords),
        title: title.to_string(),
    }
}

fn genre(genre: &str, keywords: &[&str]) -> GenreRule {
    GenreRule {
        genre: genre.to_string(),
        keywords: words(keywords),
    }
}

lazy_static! {
    static ref BUILTIN: HeuristicTables = HeuristicTables {
        emotions: vec![
            emotion(Emotion::Angry, &[
                "angry", "mad", "furious", "hate", "pissed", "annoyed", "shut up",
                "😡", "🤬", "😠",
            ]),
            emotion(Emotion::Sad, &[
                "sad", "crying", "cry", "tears", "heartbroken", "miss you", "sorry",
                "😢", "😭", "💔",
            ]),
            emotion(Emotion::Shocked, &[
                "omg", "oh my god", "what?!", "no way", "can't believe", "cant believe",
                "shocked", "wtf", "seriously?", "😱", "😮", "😳", "🤯",
            ]),
            emotion(Emotion::Happy, &[
                "happy", "love", "yay", "haha", "lol", "lmao", "excited", "great",
                "amazing", "😊", "😂", "😍", "❤️", "🥰",
            ]),
            emotion(Emotion::Scared, &[
                "scared", "afraid", "terrified", "creepy", "someone is here", "help me",
                "😨", "😰",
            ]),
            emotion(Emotion::Betrayed, &[
                "betrayed", "lied", "liar", "cheating", "cheated", "behind my back",
                "how could you", "trusted you",
            ]),
        ],
        cliffhanger_triggers: words(&[
            "you won't believe", "you wont believe", "guess what", "wait till",
            "wait until", "i have to tell you", "i need to tell you", "we need to talk",
            "something happened", "you'll never guess", "don't tell anyone",
            "to be continued", "i know what you did", "turn around", "who is this",
        ]),
        interrogatives: words(&["what", "who", "where", "why", "how", "when"]),
        media_tokens: vec![
            media("<media omitted>", MediaType::Unknown),
            media("image omitted", MediaType::Image),
            media("photo omitted", MediaType::Image),
            media("video omitted", MediaType::Video),
            media("audio omitted", MediaType::Audio),
            media("voice message omitted", MediaType::Audio),
            media("sticker omitted", MediaType::Sticker),
            media("gif omitted", MediaType::Gif),
            media("document omitted", MediaType::Document),
            media("<attached:", MediaType::Unknown),
        ],
        dramatic_keywords: words(&[
            "omg", "wtf", "oh my god", "can't believe", "no way", "seriously",
            "betrayed", "cheating", "cheated", "pregnant", "divorce", "dead", "died",
            "police", "breaking up", "break up", "fired", "secret", "lied", "caught",
            "blocked",
        ]),
        drama: DramaThresholds {
            exclamations: 2,
            questions: 2,
            uppercase_ratio: 0.3,
            min_letters: 4,
        },
        titles: vec![
            title(&["pregnant", "baby"], "The Unexpected News"),
            title(&["cheating", "cheated", "affair"], "Caught Cheating"),
            title(&["wedding", "married", "engaged", "proposal"], "Wedding Drama"),
            title(&["breakup", "break up", "breaking up", "dumped"], "The Breakup"),
            title(&["ghost", "haunted", "creepy", "someone is here"], "Something Isn't Right"),
            title(&["fired", "boss", "office"], "Office Chaos"),
            title(&["secret", "lied", "liar"], "The Secret Is Out"),
            title(&["mom", "dad", "sister", "brother", "family"], "Family Drama"),
        ],
        fallback_title: "Untitled Chat Story".to_string(),
        genres: vec![
            genre("romance", &[
                "love", "boyfriend", "girlfriend", "date", "kiss", "crush", "babe",
                "marry", "wedding", "❤️",
            ]),
            genre("family", &[
                "mom", "dad", "mother", "father", "sister", "brother", "family",
                "grandma", "grandpa", "cousin", "aunt", "uncle",
            ]),
            genre("horror", &[
                "ghost", "haunted", "creepy", "scream", "blood", "dark",
                "someone is here", "knife",
            ]),
            genre("mystery", &[
                "secret", "clue", "missing", "suspicious", "detective", "hidden",
                "who did",
            ]),
            genre("comedy", &["lol", "lmao", "haha", "joke", "funny", "😂"]),
            genre("friendship", &["friend", "bestie", "bff", "squad", "hang out"]),
            genre("workplace", &[
                "boss", "office", "fired", "job", "meeting", "coworker", "promotion",
            ]),
            genre("drama", &[
                "cheating", "cheated", "betrayed", "lied", "fight", "drama", "breakup",
            ]),
        ],
        default_genre: "drama".to_string(),
        tag_keywords: words(&[
            "drama", "romance", "love", "betrayal", "cheating", "secret", "family",
            "breakup", "wedding", "pregnant", "revenge", "friendship", "horror",
            "mystery", "school", "work", "party",
        ]),
        max_tags: 5,
        name_pool: words(&[
            "Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Jamie", "Avery",
            "Quinn", "Parker", "Skyler", "Dakota", "Reese", "Rowan", "Emerson",
            "Finley", "Hayden", "Kendall", "Logan", "Peyton",
        ]),
        scoring: ScoringWeights {
            base: 50.0,
            per_message: 0.5,
            length_cap: 10.0,
            density_weight: 20.0,
            density_cap: 20.0,
            variety_weight: 3.0,
            variety_cap: 15.0,
            cliffhanger_weight: 5.0,
            cliffhanger_cap: 15.0,
            media_weight: 2.0,
            media_cap: 10.0,
        },
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_are_populated() {
        let tables = HeuristicTables::builtin();
        assert_eq!(tables.emotions.len(), 6);
        assert!(tables
            .genres
            .iter()
            .any(|g| g.genre == tables.default_genre));
        assert_eq!(tables.name_pool.len(), 20);
        assert_eq!(tables.max_tags, 5);
    }

    #[test]
    fn builtin_emotion_order_is_declaration_order() {
        let order: Vec<Emotion> = HeuristicTables::builtin()
            .emotions
            .iter()
            .map(|r| r.emotion)
            .collect();
        assert_eq!(
            order,
            vec![
                Emotion::Angry,
                Emotion::Sad,
                Emotion::Shocked,
                Emotion::Happy,
                Emotion::Scared,
                Emotion::Betrayed,
            ]
        );
    }

    #[test]
    fn default_matches_builtin() {
        assert_eq!(&HeuristicTables::default(), HeuristicTables::builtin());
    }

    #[test]
    fn partial_ron_keeps_builtin_fields() {
        let tables = HeuristicTables::parse_ron(
            r#"(
                default_genre: "comedy",
                name_pool: ["Ash", "Bay"],
            )"#,
        )
        .unwrap();
        assert_eq!(tables.default_genre, "comedy");
        assert_eq!(tables.name_pool, vec!["Ash".to_string(), "Bay".to_string()]);
        assert_eq!(tables.genres, HeuristicTables::builtin().genres);
    }

    #[test]
    fn ron_round_trip() {
        let ron_text = HeuristicTables::builtin().to_ron().unwrap();
        let parsed = HeuristicTables::parse_ron(&ron_text).unwrap();
        assert_eq!(&parsed, HeuristicTables::builtin());
    }

    #[test]
    fn invalid_ron_is_rejected() {
        assert!(matches!(
            HeuristicTables::parse_ron("(default_genre: 42)"),
            Err(TablesError::Ron(_))
        ));
    }

    #[test]
    fn load_test_tables_from_ron() {
        let path = std::path::PathBuf::from("tests/fixtures/test_tables.ron");
        let tables = HeuristicTables::load_from_ron(&path).unwrap();
        assert_eq!(tables.fallback_title, "Mystery Chat");
        assert_eq!(tables.scoring.base, 40.0);
    }
}
