/// Line parsing for chat-export transcripts and directive scripts.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::schema::message::{Emotion, RawUtterance};
use crate::schema::story::Character;

// ---------------------------------------------------------------------------
// Chat-export transcripts
// ---------------------------------------------------------------------------

/// The timestamp/sender conventions recognized in chat exports, in the
/// order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatLineFormat {
    /// `[15/01/2024, 14:30:25] Sarah: text`
    BracketedDateTime,
    /// `15/01/24, 14:30 - Sarah: text`
    DashedShortDate,
    /// `Sarah (14:30): text`
    SenderFirstParenthesized,
    /// `2024-01-15 14:30:25 Sarah: text`
    IsoDateTime,
    /// `[14:30] Sarah: text`
    BracketedTime,
}

struct ChatPattern {
    format: ChatLineFormat,
    regex: Regex,
}

const TIME: &str = r"\d{1,2}:\d{2}(?::\d{2})?(?:\s?[AaPp]\.?[Mm]\.?)?";

fn chat_pattern(format: ChatLineFormat, pattern: &str) -> ChatPattern {
    let pattern = pattern.replace("{TIME}", TIME);
    ChatPattern {
        format,
        regex: Regex::new(&pattern).expect("chat-export patterns are valid regexes"),
    }
}

lazy_static! {
    static ref CHAT_PATTERNS: Vec<ChatPattern> = vec![
        chat_pattern(
            ChatLineFormat::BracketedDateTime,
            r"^\[(?P<date>\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}),?\s+(?P<time>{TIME})\]\s*(?P<sender>[^:]+?)\s*:\s*(?P<text>.*)$",
        ),
        chat_pattern(
            ChatLineFormat::DashedShortDate,
            r"^(?P<date>\d{1,2}[/.]\d{1,2}[/.]\d{2,4}),?\s+(?P<time>{TIME})\s+-\s+(?P<sender>[^:]+?)\s*:\s*(?P<text>.*)$",
        ),
        chat_pattern(
            ChatLineFormat::SenderFirstParenthesized,
            r"^(?P<sender>[^():\[\]]+?)\s*\((?P<time>{TIME})\)\s*:\s*(?P<text>.*)$",
        ),
        chat_pattern(
            ChatLineFormat::IsoDateTime,
            r"^(?P<date>\d{4}-\d{2}-\d{2})[T ](?P<time>\d{2}:\d{2}(?::\d{2})?)\s+(?P<sender>[^:]+?)\s*:\s*(?P<text>.*)$",
        ),
        chat_pattern(
            ChatLineFormat::BracketedTime,
            r"^\[(?P<time>{TIME})\]\s*(?P<sender>[^:]+?)\s*:\s*(?P<text>.*)$",
        ),
    ];
}

/// Strip byte-order and direction marks some exporters prepend, then trim.
fn clean_line(line: &str) -> &str {
    line.trim_start_matches(['\u{feff}', '\u{200e}', '\u{200f}'])
        .trim()
}

/// Match a single chat-export line. The first matching pattern wins; a
/// match with an empty sender or empty text is rejected outright rather
/// than retried against later patterns.
pub fn match_chat_line(line: &str) -> Option<(ChatLineFormat, RawUtterance)> {
    let line = clean_line(line);
    let (pattern, caps) = CHAT_PATTERNS
        .iter()
        .find_map(|p| p.regex.captures(line).map(|caps| (p, caps)))?;

    let sender = caps.name("sender")?.as_str().trim();
    let text = caps.name("text")?.as_str().trim();
    if sender.is_empty() || text.is_empty() {
        return None;
    }

    let timestamp = match (caps.name("date"), caps.name("time")) {
        (Some(date), Some(time)) => Some(format!("{} {}", date.as_str(), time.as_str())),
        (None, Some(time)) => Some(time.as_str().to_string()),
        (Some(date), None) => Some(date.as_str().to_string()),
        (None, None) => None,
    };

    Some((
        pattern.format,
        RawUtterance {
            sender: sender.to_string(),
            timestamp_raw: timestamp,
            text: text.to_string(),
        },
    ))
}

/// Lazy iterator over the utterances of a chat-export transcript.
///
/// Blank lines are ignored. Lines no pattern recognizes are dropped and
/// counted, never merged into a neighbouring message. Clone the iterator
/// before consuming it to restart from the top.
#[derive(Debug, Clone)]
pub struct ChatExportLines<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
    skipped: usize,
}

impl<'a> ChatExportLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Number of non-blank lines dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<'a> Iterator for ChatExportLines<'a> {
    type Item = RawUtterance;

    fn next(&mut self) -> Option<RawUtterance> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            if clean_line(line).is_empty() {
                continue;
            }
            match match_chat_line(line) {
                Some((_, utterance)) => return Some(utterance),
                None => {
                    self.skipped += 1;
                    trace!(line = self.line_no, "dropped unrecognized chat-export line");
                }
            }
        }
    }
}

pub fn parse_chat_export(text: &str) -> ChatExportLines<'_> {
    ChatExportLines::new(text)
}

// ---------------------------------------------------------------------------
// Directive scripts
// ---------------------------------------------------------------------------

/// One opcode line of a directive script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    Story(&'a str),
    Genre(&'a str),
    Character(&'a str),
    Message(&'a str),
    Emotion(&'a str),
    Cliffhanger(&'a str),
}

impl<'a> Directive<'a> {
    /// Split `KEYWORD: argument`. Keywords are case-insensitive.
    pub fn parse(line: &'a str) -> Option<Directive<'a>> {
        let (keyword, arg) = line.split_once(':')?;
        let arg = arg.trim();
        let directive = match keyword.trim().to_ascii_uppercase().as_str() {
            "STORY" => Directive::Story(arg),
            "GENRE" => Directive::Genre(arg),
            "CHARACTER" => Directive::Character(arg),
            "MESSAGE" => Directive::Message(arg),
            "EMOTION" => Directive::Emotion(arg),
            "CLIFFHANGER" => Directive::Cliffhanger(arg),
            _ => return None,
        };
        Some(directive)
    }
}

/// An utterance from a directive script, with any explicit overrides the
/// author attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveUtterance {
    pub utterance: RawUtterance,
    pub emotion: Option<Emotion>,
    pub cliffhanger: Option<bool>,
}

/// The message currently being authored.
#[derive(Debug, Clone)]
struct MessageBuilder {
    sender: String,
    text: String,
    emotion: Option<Emotion>,
    cliffhanger: Option<bool>,
}

impl MessageBuilder {
    fn finish(self) -> DirectiveUtterance {
        DirectiveUtterance {
            utterance: RawUtterance::new(self.sender, self.text),
            emotion: self.emotion,
            cliffhanger: self.cliffhanger,
        }
    }
}

/// Everything a directive script declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveDocument {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub characters: Vec<Character>,
    pub utterances: Vec<DirectiveUtterance>,
    /// Lines that were not a usable directive.
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct DirectiveState {
    doc: DirectiveDocument,
    open: Option<MessageBuilder>,
}

impl DirectiveState {
    fn step(mut self, line_no: usize, line: &str) -> Self {
        let Some(directive) = Directive::parse(line) else {
            return self.skip(line_no, "unknown directive");
        };

        match directive {
            Directive::Story(title) if !title.is_empty() => {
                self.doc.title = Some(title.to_string());
            }
            Directive::Genre(genre) if !genre.is_empty() => {
                self.doc.genre = Some(genre.to_lowercase());
            }
            Directive::Character(decl) => match parse_character(decl) {
                Some(character) => declare(&mut self.doc.characters, character),
                None => return self.skip(line_no, "empty character declaration"),
            },
            Directive::Message(body) => {
                let Some((sender, text)) = body.split_once(':') else {
                    return self.skip(line_no, "message without sender");
                };
                let (sender, text) = (sender.trim(), text.trim());
                if sender.is_empty() || text.is_empty() {
                    return self.skip(line_no, "message without sender or text");
                }
                self.close_open();
                self.open = Some(MessageBuilder {
                    sender: sender.to_string(),
                    text: text.to_string(),
                    emotion: None,
                    cliffhanger: None,
                });
            }
            Directive::Emotion(name) => {
                let Some(emotion) = Emotion::parse(name) else {
                    return self.skip(line_no, "unknown emotion");
                };
                match self.open.as_mut() {
                    Some(builder) => builder.emotion = Some(emotion),
                    None => return self.skip(line_no, "emotion with no open message"),
                }
            }
            Directive::Cliffhanger(flag) => {
                let Some(flag) = parse_flag(flag) else {
                    return self.skip(line_no, "unparseable cliffhanger flag");
                };
                match self.open.as_mut() {
                    Some(builder) => builder.cliffhanger = Some(flag),
                    None => return self.skip(line_no, "cliffhanger with no open message"),
                }
            }
            Directive::Story(_) | Directive::Genre(_) => {
                return self.skip(line_no, "empty header directive");
            }
        }
        self
    }

    fn skip(mut self, line_no: usize, reason: &'static str) -> Self {
        self.doc.skipped += 1;
        trace!(line = line_no, reason, "skipped directive line");
        self
    }

    fn close_open(&mut self) {
        if let Some(builder) = self.open.take() {
            self.doc.utterances.push(builder.finish());
        }
    }

    fn finish(mut self) -> DirectiveDocument {
        self.close_open();
        self.doc
    }
}

/// `Name`, `Name - role`, or `Name (role)`.
fn parse_character(decl: &str) -> Option<Character> {
    let decl = decl.trim();
    let (name, role) = if let Some((name, rest)) = decl.split_once('(') {
        (name, Some(rest.trim_end_matches(')')))
    } else if let Some((name, role)) = decl.split_once(" - ") {
        (name, Some(role))
    } else {
        (decl, None)
    };

    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(Character {
        name: name.to_string(),
        role: role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        avatar: None,
    })
}

/// Record a declaration; redeclaring a name only fills in a missing role.
fn declare(characters: &mut Vec<Character>, character: Character) {
    match characters.iter_mut().find(|c| c.name == character.name) {
        Some(existing) => {
            if existing.role.is_none() {
                existing.role = character.role;
            }
        }
        None => characters.push(character),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a directive script by folding its lines into a document.
pub fn parse_directive_text(text: &str) -> DirectiveDocument {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .fold(DirectiveState::default(), |state, (line_no, line)| {
            state.step(line_no, line)
        })
        .finish()
}
