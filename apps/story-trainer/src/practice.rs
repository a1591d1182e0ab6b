//! Pronunciation scoring against a page's English text.
//!
//! The transcript is whatever the recognizer heard; in the terminal the
//! learner types it. Scores are character-level similarity ratios.

use crate::config::PracticeConfig;
use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Great,
    Almost,
    TryAgain,
}

impl Feedback {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Great => "Great job! Your pronunciation is excellent.",
            Self::Almost => "Almost there! Try once more.",
            Self::TryAgain => "Let's try again. Listen and repeat slowly.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeScore {
    pub transcript: String,
    /// Similarity in `0.0..=1.0`.
    pub score: f64,
    pub feedback: Feedback,
    /// Target words that did not appear in the transcript.
    pub missed_words: Vec<String>,
}

impl PracticeScore {
    pub fn percent(&self) -> u32 {
        (self.score * 100.0).round() as u32
    }

    pub fn is_good(&self) -> bool {
        self.feedback == Feedback::Great
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PracticeOutcome {
    /// Nothing was heard.
    Unrecognized,
    Scored(PracticeScore),
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Similarity ratio of two texts after trimming and lower-casing.
pub fn similarity(target: &str, transcript: &str) -> f64 {
    let target = normalize(target);
    let transcript = normalize(transcript);
    f64::from(TextDiff::from_chars(target.as_str(), transcript.as_str()).ratio())
}

fn missed_words(target: &str, transcript: &str) -> Vec<String> {
    let target = normalize(target);
    let transcript = normalize(transcript);
    let diff = TextDiff::from_words(target.as_str(), transcript.as_str());
    diff.iter_all_changes()
        .filter(|change| change.tag() == ChangeTag::Delete)
        .map(|change| change.value().trim().to_string())
        .filter(|word| !word.is_empty())
        .collect()
}

pub fn feedback_for(score: f64, config: &PracticeConfig) -> Feedback {
    if score >= config.good_threshold {
        Feedback::Great
    } else if score >= config.fair_threshold {
        Feedback::Almost
    } else {
        Feedback::TryAgain
    }
}

/// Score one attempt at reading `target` aloud.
pub fn evaluate(target: &str, transcript: &str, config: &PracticeConfig) -> PracticeOutcome {
    if transcript.trim().is_empty() {
        return PracticeOutcome::Unrecognized;
    }
    let score = similarity(target, transcript);
    PracticeOutcome::Scored(PracticeScore {
        transcript: transcript.trim().to_string(),
        score,
        feedback: feedback_for(score, config),
        missed_words: missed_words(target, transcript),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(outcome: PracticeOutcome) -> PracticeScore {
        match outcome {
            PracticeOutcome::Scored(score) => score,
            PracticeOutcome::Unrecognized => panic!("expected a score"),
        }
    }

    #[test]
    fn test_exact_match_ignores_case_and_padding() {
        let score = scored(evaluate("The cat sat.", "  the CAT sat. ", &PracticeConfig::default()));
        assert_eq!(score.score, 1.0);
        assert_eq!(score.percent(), 100);
        assert!(score.is_good());
        assert!(score.missed_words.is_empty());
    }

    #[test]
    fn test_empty_transcript_is_unrecognized() {
        let config = PracticeConfig::default();
        assert_eq!(evaluate("The cat sat.", "", &config), PracticeOutcome::Unrecognized);
        assert_eq!(evaluate("The cat sat.", "   ", &config), PracticeOutcome::Unrecognized);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        let score = scored(evaluate("The cat sat on the mat.", "xyz", &PracticeConfig::default()));
        assert!(score.score < 0.5);
        assert_eq!(score.feedback, Feedback::TryAgain);
    }

    #[test]
    fn test_close_attempt_reports_missed_word() {
        let score = scored(evaluate("the cat sat on the mat", "the cat sat on the", &PracticeConfig::default()));
        assert!(score.score >= 0.7);
        assert_eq!(score.missed_words, vec!["mat".to_string()]);
    }

    #[test]
    fn test_feedback_tiers() {
        let config = PracticeConfig::default();
        assert_eq!(feedback_for(0.7, &config), Feedback::Great);
        assert_eq!(feedback_for(0.69, &config), Feedback::Almost);
        assert_eq!(feedback_for(0.5, &config), Feedback::Almost);
        assert_eq!(feedback_for(0.49, &config), Feedback::TryAgain);

        let strict = PracticeConfig { good_threshold: 0.9, fair_threshold: 0.8 };
        assert_eq!(feedback_for(0.85, &strict), Feedback::Almost);
    }
}
