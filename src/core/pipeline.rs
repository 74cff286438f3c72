/// The import pipeline: raw text → Story orchestration.
///
/// Wires together line parsing, signal detection, optional anonymization,
/// assembly, and scoring, and owns failure handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::anonymizer::{Anonymizer, AnonymizerError};
use crate::core::assembler::{AssemblyHints, StoryAssembler};
use crate::core::collaborators::{ImportObserver, StoreError, StoredStory, StoryStore};
use crate::core::line_parser::{parse_chat_export, parse_directive_text};
use crate::core::scorer::ViralScorer;
use crate::core::signal::{SignalDetector, SignalOverrides};
use crate::core::tables::{HeuristicTables, TablesError, MAX_TAGS};
use crate::schema::message::Message;
use crate::schema::story::{Story, StorySource};
use crate::schema::structured::{parse_json_stories, StructuredInputError, StructuredStory};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("malformed structured input: {0}")]
    MalformedStructuredInput(#[from] StructuredInputError),
    #[error("no usable content ({skipped} lines skipped)")]
    NoUsableContent { skipped: usize },
    #[error("tables error: {0}")]
    Tables(#[from] TablesError),
    #[error("anonymizer error: {0}")]
    Anonymizer(#[from] AnonymizerError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Stable machine-readable code for callers that re-submit input.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::MalformedStructuredInput(_) => "malformed_structured_input",
            Self::NoUsableContent { .. } => "no_usable_content",
            Self::Tables(_) => "invalid_tables",
            Self::Anonymizer(_) => "anonymizer_failed",
            Self::Store(_) => "store_failed",
        }
    }

    /// The pipeline state the run failed from. `None` for failures outside
    /// a run (table loading, persistence).
    pub fn failed_in(&self) -> Option<ImportState> {
        match self {
            Self::UnsupportedFormat(_) | Self::MalformedStructuredInput(_) => {
                Some(ImportState::Parsing)
            }
            Self::NoUsableContent { .. } => Some(ImportState::Assembling),
            Self::Anonymizer(_) => Some(ImportState::Anonymizing),
            Self::Tables(_) | Self::Store(_) => None,
        }
    }
}

/// Input formats the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatHint {
    DirectiveText,
    ChatExport,
    JsonStories,
}

impl FormatHint {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectiveText => "directive-text",
            Self::ChatExport => "chat-export",
            Self::JsonStories => "json-stories",
        }
    }

    pub fn source(&self) -> StorySource {
        match self {
            Self::DirectiveText => StorySource::Manual,
            Self::ChatExport => StorySource::ChatExport,
            Self::JsonStories => StorySource::Template,
        }
    }
}

impl FromStr for FormatHint {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "directive-text" => Ok(Self::DirectiveText),
            "chat-export" => Ok(Self::ChatExport),
            "json-stories" => Ok(Self::JsonStories),
            _ => Err(ImportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportOptions {
    pub anonymize: bool,
    /// Reserved. Dramatic-moment detection always feeds the score.
    pub detect_drama: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            anonymize: false,
            detect_drama: true,
        }
    }
}

/// Stages of a single import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImportState {
    Idle,
    Parsing,
    Classifying,
    Anonymizing,
    Assembling,
    Scored,
    Done,
    Failed,
}

/// A finished import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub story: Story,
    /// Lines dropped during parsing.
    pub skipped_lines: usize,
    /// States visited, starting at `Idle` and ending at `Done`.
    pub trail: Vec<ImportState>,
}

/// Tracks the state trail of one run.
struct Run {
    trail: Vec<ImportState>,
}

impl Run {
    fn start() -> Self {
        Self {
            trail: vec![ImportState::Idle],
        }
    }

    fn enter(&mut self, state: ImportState) {
        debug!(?state, "import state");
        self.trail.push(state);
    }

    fn fail(&mut self, error: ImportError) -> ImportError {
        self.enter(ImportState::Failed);
        error
    }
}

/// Parsed and classified content, before anonymization and assembly.
struct Classified {
    messages: Vec<Message>,
    hints: AssemblyHints,
    skipped: usize,
}

/// The story importer. Built via `Importer::builder()`.
///
/// Holds only read-only tables, so one importer can serve concurrent
/// requests.
#[derive(Clone)]
pub struct Importer {
    tables: Arc<HeuristicTables>,
    observer: Option<Arc<dyn ImportObserver>>,
}

/// Builder for constructing an `Importer`.
#[derive(Default)]
pub struct ImporterBuilder {
    tables_path: Option<PathBuf>,
    /// Directly provided tables (for testing without files).
    tables: Option<HeuristicTables>,
    observer: Option<Arc<dyn ImportObserver>>,
}

impl Importer {
    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::default()
    }

    pub fn tables(&self) -> &HeuristicTables {
        &self.tables
    }

    /// Import `text` as a single story. For `json-stories` this is the
    /// first story of the document.
    pub fn run(
        &self,
        text: &str,
        format: FormatHint,
        options: ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let result = match format {
            FormatHint::DirectiveText | FormatHint::ChatExport => {
                self.import_lines(text, format, options)
            }
            FormatHint::JsonStories => self
                .import_json(text, options)
                .map(|reports| reports.into_iter().next())
                .and_then(|first| first.ok_or(ImportError::NoUsableContent { skipped: 0 })),
        };
        match &result {
            Ok(report) => self.imported(format, report),
            Err(e) => self.failed(format.name(), e),
        }
        result
    }

    /// Like [`Importer::run`], with the format given by name.
    pub fn run_named(
        &self,
        text: &str,
        format: &str,
        options: ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        match format.parse::<FormatHint>() {
            Ok(format) => self.run(text, format, options),
            Err(e) => {
                self.failed(format, &e);
                Err(e)
            }
        }
    }

    /// Import every story of a `json-stories` document.
    pub fn run_json_stories(
        &self,
        text: &str,
        options: ImportOptions,
    ) -> Result<Vec<ImportReport>, ImportError> {
        let result = self.import_json(text, options);
        match &result {
            Ok(reports) => {
                for report in reports {
                    self.imported(FormatHint::JsonStories, report);
                }
            }
            Err(e) => self.failed(FormatHint::JsonStories.name(), e),
        }
        result
    }

    /// Import and hand the story to `store`.
    pub fn run_and_store<S: StoryStore + ?Sized>(
        &self,
        text: &str,
        format: FormatHint,
        options: ImportOptions,
        store: &S,
    ) -> Result<StoredStory, ImportError> {
        let report = self.run(text, format, options)?;
        Ok(store.create_story(report.story)?)
    }

    fn imported(&self, format: FormatHint, report: &ImportReport) {
        info!(
            format = format.name(),
            story_id = %report.story.id,
            messages = report.story.messages.len(),
            score = report.story.estimated_viral_score,
            skipped = report.skipped_lines,
            "story imported"
        );
        if let Some(observer) = &self.observer {
            observer.imported(&report.story);
        }
    }

    fn failed(&self, format: &str, error: &ImportError) {
        warn!(format, reason = error.reason_code(), error = %error, "import failed");
        if let Some(observer) = &self.observer {
            observer.failed(error);
        }
    }

    fn import_lines(
        &self,
        text: &str,
        format: FormatHint,
        options: ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let mut run = Run::start();
        run.enter(ImportState::Parsing);

        let detector = SignalDetector::new(&self.tables);
        let classified = match format {
            FormatHint::DirectiveText => {
                let doc = parse_directive_text(text);
                run.enter(ImportState::Classifying);
                let messages = detector.classify_all(doc.utterances.into_iter().map(|d| {
                    (
                        d.utterance,
                        SignalOverrides {
                            emotion: d.emotion,
                            cliffhanger: d.cliffhanger,
                        },
                    )
                }));
                Classified {
                    messages,
                    hints: AssemblyHints {
                        title: doc.title,
                        genre: doc.genre,
                        tags: Vec::new(),
                        characters: doc.characters,
                    },
                    skipped: doc.skipped,
                }
            }
            FormatHint::ChatExport => {
                let mut lines = parse_chat_export(text);
                let utterances: Vec<_> = lines.by_ref().collect();
                run.enter(ImportState::Classifying);
                let messages = detector.classify_all(
                    utterances
                        .into_iter()
                        .map(|u| (u, SignalOverrides::default())),
                );
                Classified {
                    messages,
                    hints: AssemblyHints::default(),
                    skipped: lines.skipped(),
                }
            }
            FormatHint::JsonStories => {
                return Err(run.fail(ImportError::UnsupportedFormat(
                    format.name().to_string(),
                )))
            }
        };

        self.finish(run, classified, format.source(), options)
    }

    fn import_json(
        &self,
        text: &str,
        options: ImportOptions,
    ) -> Result<Vec<ImportReport>, ImportError> {
        let mut run = Run::start();
        run.enter(ImportState::Parsing);
        let stories = parse_json_stories(text).map_err(|e| run.fail(e.into()))?;
        if stories.is_empty() {
            run.enter(ImportState::Assembling);
            return Err(run.fail(ImportError::NoUsableContent { skipped: 0 }));
        }

        stories
            .into_iter()
            .map(|story| {
                let mut run = Run {
                    trail: run.trail.clone(),
                };
                // Structured stories arrive classified; detection is bypassed.
                run.enter(ImportState::Classifying);
                let classified = self.structured(story);
                self.finish(run, classified, StorySource::Template, options)
            })
            .collect()
    }

    fn structured(&self, story: StructuredStory) -> Classified {
        let genre = story
            .genre
            .unwrap_or_else(|| self.tables.default_genre.clone());
        Classified {
            messages: story.messages,
            hints: AssemblyHints {
                title: Some(story.title),
                genre: Some(genre),
                tags: story.tags,
                characters: story.characters,
            },
            skipped: 0,
        }
    }

    fn finish(
        &self,
        mut run: Run,
        classified: Classified,
        source: StorySource,
        options: ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let Classified {
            mut messages,
            mut hints,
            skipped,
        } = classified;

        if options.anonymize && !messages.is_empty() {
            run.enter(ImportState::Anonymizing);
            let anonymized = Anonymizer::new(&self.tables.name_pool)
                .anonymize(messages, hints.characters)
                .map_err(|e| run.fail(e.into()))?;
            debug!(names = anonymized.names.len(), "anonymized senders");
            messages = anonymized.messages;
            hints.characters = anonymized.characters;
        }

        run.enter(ImportState::Assembling);
        if messages.is_empty() {
            return Err(run.fail(ImportError::NoUsableContent { skipped }));
        }
        let assembled = StoryAssembler::new(&self.tables).assemble(&messages, &hints);

        let score = ViralScorer::new(&self.tables).score(&messages);
        run.enter(ImportState::Scored);

        let story = assembled.into_story(messages, score, source);
        run.enter(ImportState::Done);

        Ok(ImportReport {
            story,
            skipped_lines: skipped,
            trail: run.trail,
        })
    }
}

impl ImporterBuilder {
    /// Load tables from a RON file. Fields the file leaves out keep their
    /// built-in values.
    pub fn tables_path(mut self, path: impl AsRef<Path>) -> Self {
        self.tables_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide tables directly (for testing without files). Takes
    /// precedence over `tables_path`.
    pub fn tables(mut self, tables: HeuristicTables) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ImportObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Importer, ImportError> {
        let tables = match (self.tables, self.tables_path) {
            (Some(tables), _) => tables,
            (None, Some(path)) => {
                debug!(path = %path.display(), "loading heuristic tables");
                HeuristicTables::load_from_ron(&path)?
            }
            (None, None) => HeuristicTables::builtin().clone(),
        };

        if tables.name_pool.is_empty() {
            return Err(TablesError::Invalid("name pool is empty".to_string()).into());
        }
        if tables.max_tags > MAX_TAGS {
            return Err(TablesError::Invalid(format!(
                "max_tags is {}, at most {} allowed",
                tables.max_tags, MAX_TAGS
            ))
            .into());
        }

        Ok(Importer {
            tables: Arc::new(tables),
            observer: self.observer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collaborators::InMemoryStoryStore;
    use crate::schema::message::Emotion;
    use std::sync::Mutex;

    fn importer() -> Importer {
        Importer::builder().build().unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ImportObserver for Recorder {
        fn imported(&self, story: &Story) {
            self.events.lock().unwrap().push(format!("ok:{}", story.title));
        }
        fn failed(&self, error: &ImportError) {
            self.events
                .lock()
                .unwrap()
                .push(format!("err:{}", error.reason_code()));
        }
    }

    const DIRECTIVE: &str = "STORY: Test\nGENRE: family\nCHARACTER: Amy\nMESSAGE: Amy: I can't believe this!!!\nEMOTION: shocked\nCLIFFHANGER: true";

    #[test]
    fn format_hint_from_str() {
        assert_eq!("chat-export".parse::<FormatHint>().unwrap(), FormatHint::ChatExport);
        assert_eq!("JSON_STORIES".parse::<FormatHint>().unwrap(), FormatHint::JsonStories);
        let err = "pdf".parse::<FormatHint>().unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(ref f) if f == "pdf"));
        assert_eq!(err.failed_in(), Some(ImportState::Parsing));
    }

    #[test]
    fn directive_run() {
        let report = importer()
            .run(DIRECTIVE, FormatHint::DirectiveText, ImportOptions::default())
            .unwrap();
        let story = &report.story;
        assert_eq!(story.title, "Test");
        assert_eq!(story.genre, "family");
        assert_eq!(story.source, StorySource::Manual);
        assert!(!story.is_imported);
        assert_eq!(story.messages.len(), 1);
        assert_eq!(story.messages[0].sender, "Amy");
        assert_eq!(story.messages[0].emotion, Emotion::Shocked);
        assert!(story.messages[0].is_cliffhanger);
        assert_eq!(
            report.trail,
            vec![
                ImportState::Idle,
                ImportState::Parsing,
                ImportState::Classifying,
                ImportState::Assembling,
                ImportState::Scored,
                ImportState::Done,
            ]
        );
    }

    #[test]
    fn anonymize_adds_state() {
        let report = importer()
            .run(
                DIRECTIVE,
                FormatHint::DirectiveText,
                ImportOptions {
                    anonymize: true,
                    detect_drama: true,
                },
            )
            .unwrap();
        assert!(report.trail.contains(&ImportState::Anonymizing));
        assert_ne!(report.story.messages[0].sender, "Amy");
        assert_eq!(report.story.characters[0].name, report.story.messages[0].sender);
    }

    #[test]
    fn detect_drama_does_not_gate_scoring() {
        let text = "[14:30] Ana: NO WAY!!\n[14:31] Ben: what?!";
        let on = importer()
            .run(text, FormatHint::ChatExport, ImportOptions::default())
            .unwrap();
        let off = importer()
            .run(
                text,
                FormatHint::ChatExport,
                ImportOptions {
                    anonymize: false,
                    detect_drama: false,
                },
            )
            .unwrap();
        assert_eq!(on.story.estimated_viral_score, off.story.estimated_viral_score);
    }

    #[test]
    fn empty_chat_is_no_usable_content() {
        let err = importer()
            .run("hello\nworld", FormatHint::ChatExport, ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ImportError::NoUsableContent { skipped: 2 }));
        assert_eq!(err.reason_code(), "no_usable_content");
        assert_eq!(err.failed_in(), Some(ImportState::Assembling));
    }

    #[test]
    fn malformed_json() {
        let err = importer()
            .run("{oops", FormatHint::JsonStories, ImportOptions::default())
            .unwrap_err();
        assert_eq!(err.reason_code(), "malformed_structured_input");
        assert_eq!(err.failed_in(), Some(ImportState::Parsing));
    }

    #[test]
    fn empty_json_story_list() {
        let err = importer()
            .run(r#"{"stories":[]}"#, FormatHint::JsonStories, ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ImportError::NoUsableContent { skipped: 0 }));
    }

    #[test]
    fn json_genre_defaults() {
        let report = importer()
            .run(
                r#"{"stories":[{"title":"T","messages":[{"sender":"A","message":"I love you"}]}]}"#,
                FormatHint::JsonStories,
                ImportOptions::default(),
            )
            .unwrap();
        assert_eq!(report.story.genre, "drama");
        assert_eq!(report.story.source, StorySource::Template);
        // Detection is bypassed for structured input.
        assert_eq!(report.story.messages[0].emotion, Emotion::Neutral);
    }

    #[test]
    fn observer_sees_outcomes() {
        let recorder = Arc::new(Recorder::default());
        let importer = Importer::builder()
            .observer(recorder.clone())
            .build()
            .unwrap();
        importer
            .run(DIRECTIVE, FormatHint::DirectiveText, ImportOptions::default())
            .unwrap();
        let _ = importer.run_named("x", "pdf", ImportOptions::default());
        let _ = importer.run("", FormatHint::ChatExport, ImportOptions::default());
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["ok:Test", "err:unsupported_format", "err:no_usable_content"]
        );
    }

    #[test]
    fn run_and_store_assigns_durable_id() {
        let store = InMemoryStoryStore::new();
        let stored = importer()
            .run_and_store(DIRECTIVE, FormatHint::DirectiveText, ImportOptions::default(), &store)
            .unwrap();
        assert_eq!(stored.id.0, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn builder_rejects_empty_name_pool() {
        let mut tables = HeuristicTables::builtin().clone();
        tables.name_pool.clear();
        assert!(matches!(
            Importer::builder().tables(tables).build(),
            Err(ImportError::Tables(_))
        ));
    }

    #[test]
    fn builder_rejects_too_many_tags() {
        let tables = HeuristicTables::parse_ron("(max_tags: 8)").unwrap();
        let err = Importer::builder().tables(tables).build().err().unwrap();
        assert!(matches!(err, ImportError::Tables(TablesError::Invalid(_))));
        assert_eq!(err.reason_code(), "invalid_tables");

        let tables = HeuristicTables::parse_ron("(max_tags: 5)").unwrap();
        let importer = Importer::builder().tables(tables).build().unwrap();
        let report = importer
            .run(
                "[14:30] Ana: drama romance love betrayal cheating secret family breakup",
                FormatHint::ChatExport,
                ImportOptions::default(),
            )
            .unwrap();
        assert_eq!(report.story.tags.len(), 5);
    }

    #[test]
    fn builder_loads_tables_from_file() {
        let importer = Importer::builder()
            .tables_path("tests/fixtures/test_tables.ron")
            .build()
            .unwrap();
        assert_eq!(importer.tables().fallback_title, "Mystery Chat");
    }

    #[test]
    fn importer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Importer>();
    }
}
