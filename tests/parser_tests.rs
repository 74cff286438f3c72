/// Parser and detector tests against the fixture transcripts.

use story_ingest::core::line_parser::{
    match_chat_line, parse_chat_export, parse_directive_text, ChatLineFormat,
};
use story_ingest::core::signal::SignalDetector;
use story_ingest::core::tables::HeuristicTables;
use story_ingest::schema::message::{Emotion, MediaType};
use story_ingest::schema::structured::{parse_json_stories, StructuredInputError};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
}

fn detector() -> SignalDetector<'static> {
    SignalDetector::new(HeuristicTables::builtin())
}

#[test]
fn chat_fixture_keeps_source_order() {
    let text = fixture("family_chat.txt");
    let mut lines = parse_chat_export(&text);
    let senders: Vec<String> = lines.by_ref().map(|u| u.sender).collect();
    assert_eq!(
        senders,
        vec!["Sarah", "Mike", "Sarah", "Mike", "Sarah", "Mike", "Sarah"]
    );
    assert_eq!(lines.skipped(), 2);
}

#[test]
fn chat_iterator_restarts_from_a_clone() {
    let text = fixture("family_chat.txt");
    let lines = parse_chat_export(&text);
    let mut partial = lines.clone();
    partial.next();
    partial.next();
    assert_eq!(partial.count(), 5);
    assert_eq!(lines.count(), 7);
}

#[test]
fn every_supported_line_shape() {
    let cases = [
        ("[15/01/2024, 14:30:25] Sarah: hi", ChatLineFormat::BracketedDateTime),
        ("15/01/24, 14:30 - Sarah: hi", ChatLineFormat::DashedShortDate),
        ("Sarah (14:30): hi", ChatLineFormat::SenderFirstParenthesized),
        ("2024-01-15 14:30:25 Sarah: hi", ChatLineFormat::IsoDateTime),
        ("[2:30 PM] Sarah: hi", ChatLineFormat::BracketedTime),
    ];
    for (line, expected) in cases {
        let (format, utterance) = match_chat_line(line).unwrap();
        assert_eq!(format, expected, "{line}");
        assert_eq!(utterance.sender, "Sarah");
        assert_eq!(utterance.text, "hi");
    }
}

#[test]
fn well_formed_mixed_transcript_keeps_every_line() {
    let text = "\
[15/01/2024, 14:30:25] Sarah: did you see it?
15/01/24, 14:31 - Mike: see what
Sarah (14:32): the video omitted
2024-01-15 14:33:00 Mike: oh no
[14:34] Sarah: guess what?
[1/5/24, 9:05 PM] Mike: tell me
Sarah (9:06 pm): later...
";
    let mut lines = parse_chat_export(text);
    let utterances: Vec<_> = lines.by_ref().collect();
    assert_eq!(utterances.len(), text.lines().count());
    assert_eq!(lines.skipped(), 0);
    let senders: Vec<&str> = utterances.iter().map(|u| u.sender.as_str()).collect();
    assert_eq!(senders, vec!["Sarah", "Mike", "Sarah", "Mike", "Sarah", "Mike", "Sarah"]);
    assert_eq!(utterances[6].text, "later...");
}

#[test]
fn directive_fixture() {
    let doc = parse_directive_text(&fixture("breakup_script.txt"));
    assert_eq!(doc.title.as_deref(), Some("The Last Text"));
    assert_eq!(doc.genre.as_deref(), Some("romance"));
    assert_eq!(doc.characters.len(), 2);
    assert_eq!(doc.utterances.len(), 4);
    assert_eq!(doc.utterances[0].emotion, Some(Emotion::Sad));
    assert_eq!(doc.utterances[1].emotion, None);
    assert_eq!(doc.utterances[3].cliffhanger, Some(true));
    assert_eq!(doc.skipped, 1);
}

#[test]
fn json_fixture_parses() {
    let stories = parse_json_stories(&fixture("stories.json")).unwrap();
    assert_eq!(stories.len(), 2);
    assert_eq!(stories[0].genre.as_deref(), Some("comedy"));
    assert_eq!(stories[1].genre, None);
    assert_eq!(stories[0].messages[2].id, 3);
}

#[test]
fn json_requires_message_text() {
    let err = parse_json_stories(
        r#"{"stories":[{"title":"T","messages":[{"sender":"A","message":"  "}]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        StructuredInputError::EmptyMessageField {
            story: 0,
            message: 0,
            field: "message"
        }
    ));
}

#[test]
fn detector_emotion_precedence() {
    // Angry is declared before happy, so it wins when both match.
    assert_eq!(detector().emotion("I hate that I love you"), Emotion::Angry);
    assert_eq!(detector().emotion("see you at noon"), Emotion::Neutral);
}

#[test]
fn detector_cliffhangers() {
    let d = detector();
    assert!(d.is_cliffhanger("guess what"));
    assert!(d.is_cliffhanger("and then..."));
    assert!(d.is_cliffhanger("you know who?!"));
    assert!(!d.is_cliffhanger("did you eat?"));
}

#[test]
fn detector_media_placeholders() {
    let d = detector();
    assert_eq!(d.media_type("video omitted"), Some(MediaType::Video));
    assert_eq!(d.media_type("<Media omitted>"), Some(MediaType::Unknown));
    assert_eq!(d.media_type("look at this picture"), None);
}

#[test]
fn shouting_needs_enough_letters() {
    let d = detector();
    assert!(d.is_dramatic("WHERE ARE YOU"));
    assert!(!d.is_dramatic("OK"));
    assert!(!d.is_dramatic("see you soon"));
}
