/// Viral score — a bounded engagement estimate for a message sequence.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::core::signal::SignalDetector;
use crate::core::tables::HeuristicTables;
use crate::schema::message::Message;

pub const MAX_SCORE: u8 = 100;

/// Per-term contributions, each already capped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f32,
    pub length: f32,
    pub drama_density: f32,
    pub emotion_variety: f32,
    pub cliffhangers: f32,
    pub media: f32,
    pub total: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct ViralScorer<'t> {
    tables: &'t HeuristicTables,
}

impl<'t> ViralScorer<'t> {
    pub fn new(tables: &'t HeuristicTables) -> Self {
        Self { tables }
    }

    pub fn score(&self, messages: &[Message]) -> u8 {
        self.breakdown(messages).total
    }

    pub fn breakdown(&self, messages: &[Message]) -> ScoreBreakdown {
        let w = &self.tables.scoring;
        let detector = SignalDetector::new(self.tables);
        let n = messages.len();

        let dramatic = messages.iter().filter(|m| detector.is_dramatic(&m.text)).count();
        let emotions: FxHashSet<_> = messages.iter().map(|m| m.emotion).collect();
        let cliffhangers = messages.iter().filter(|m| m.is_cliffhanger).count();
        let media = messages.iter().filter(|m| m.has_media).count();

        let length = (n as f32 * w.per_message).min(w.length_cap);
        let drama_density = if n == 0 {
            0.0
        } else {
            (dramatic as f32 / n as f32 * w.density_weight)
                .round()
                .min(w.density_cap)
        };
        let emotion_variety = (emotions.len() as f32 * w.variety_weight).min(w.variety_cap);
        let cliffhangers = (cliffhangers as f32 * w.cliffhanger_weight).min(w.cliffhanger_cap);
        let media = (media as f32 * w.media_weight).min(w.media_cap);

        let raw = w.base + length + drama_density + emotion_variety + cliffhangers + media;
        let total = raw.round().clamp(0.0, MAX_SCORE as f32) as u8;

        ScoreBreakdown {
            base: w.base,
            length,
            drama_density,
            emotion_variety,
            cliffhangers,
            media,
            total,
        }
    }
}

/// Score with the built-in tables.
pub fn viral_score(messages: &[Message]) -> u8 {
    ViralScorer::new(HeuristicTables::builtin()).score(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::message::{Emotion, MediaType};

    fn plain(text: &str) -> Message {
        Message {
            id: 0,
            sender: "A".to_string(),
            timestamp_raw: None,
            text: text.to_string(),
            emotion: Emotion::Neutral,
            is_cliffhanger: false,
            has_media: false,
            media_type: None,
            delay_ms: None,
        }
    }

    #[test]
    fn empty_input_scores_base() {
        assert_eq!(viral_score(&[]), 50);
    }

    #[test]
    fn single_plain_message() {
        // 50 + 0.5 (length) + 3 (one emotion) = 53.5 → 54
        assert_eq!(viral_score(&[plain("see you at noon")]), 54);
    }

    #[test]
    fn terms_are_capped_independently() {
        let mut messages: Vec<Message> = (0..200).map(|_| plain("no way!!")).collect();
        for m in messages.iter_mut() {
            m.is_cliffhanger = true;
            m.has_media = true;
            m.media_type = Some(MediaType::Image);
        }
        for (m, e) in messages.iter_mut().zip(Emotion::ALL) {
            m.emotion = e;
        }
        let b = ViralScorer::new(HeuristicTables::builtin()).breakdown(&messages);
        assert_eq!(b.length, 10.0);
        assert_eq!(b.drama_density, 20.0);
        assert_eq!(b.emotion_variety, 15.0);
        assert_eq!(b.cliffhangers, 15.0);
        assert_eq!(b.media, 10.0);
        assert_eq!(b.total, MAX_SCORE);
    }

    #[test]
    fn heavy_base_is_clamped() {
        let mut tables = HeuristicTables::builtin().clone();
        tables.scoring.base = 250.0;
        assert_eq!(ViralScorer::new(&tables).score(&[plain("hi")]), 100);
        tables.scoring.base = -80.0;
        assert_eq!(ViralScorer::new(&tables).score(&[plain("hi")]), 0);
    }

    #[test]
    fn drama_density_is_rounded() {
        // 1 of 3 dramatic: 20 / 3 = 6.67 → 7
        let messages = vec![plain("omg"), plain("ok"), plain("fine")];
        let b = ViralScorer::new(HeuristicTables::builtin()).breakdown(&messages);
        assert_eq!(b.drama_density, 7.0);
    }

    #[test]
    fn score_is_deterministic() {
        let messages = vec![plain("omg"), plain("what?"), plain("ok")];
        assert_eq!(viral_score(&messages), viral_score(&messages));
    }
}
