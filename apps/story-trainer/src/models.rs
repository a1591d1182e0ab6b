//! Data models for story trainer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique story identifier.
pub type StoryId = Uuid;

/// Maximum number of term pairs kept per story.
pub const MAX_TERMS: usize = 30;

/// A storybook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Unique identifier.
    pub id: StoryId,
    /// Story title.
    pub title: String,
    /// Where the story came from ("manual", "text_import", or a URL).
    #[serde(default)]
    pub source_url: String,
    /// Pages in reading order.
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Story {
    /// Create a new story.
    pub fn new(title: impl Into<String>, source_url: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            source_url: source_url.into(),
            pages,
        }
    }

    /// All English page text joined with spaces.
    pub fn english_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.en.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A single illustrated page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Illustration URL or data URL, empty when absent.
    #[serde(default)]
    pub image_url: String,
    /// English text.
    pub en: String,
    /// Korean translation.
    #[serde(default)]
    pub ko: String,
}

impl Page {
    pub fn new(en: impl Into<String>, ko: impl Into<String>) -> Self {
        Self {
            image_url: String::new(),
            en: en.into(),
            ko: ko.into(),
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = url.into();
        self
    }
}

/// An English word or phrase with its Korean equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    pub english: String,
    pub korean: String,
}

impl TermPair {
    /// Build a pair, rejecting blank sides.
    pub fn new(english: impl AsRef<str>, korean: impl AsRef<str>) -> Option<Self> {
        let english = english.as_ref().trim();
        let korean = korean.as_ref().trim();
        if english.is_empty() || korean.is_empty() {
            return None;
        }
        Some(Self {
            english: english.to_string(),
            korean: korean.to_string(),
        })
    }
}

/// Extracted vocabulary for one story.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    /// Free-form explanation of key words and grammar.
    pub explanation: String,
    /// At most [`MAX_TERMS`] pairs.
    pub terms: Vec<TermPair>,
}

impl Vocabulary {
    pub fn new(explanation: impl Into<String>, mut terms: Vec<TermPair>) -> Self {
        terms.truncate(MAX_TERMS);
        Self {
            explanation: explanation.into().trim().to_string(),
            terms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Which way a flashcard asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    EnToKo,
    KoToEn,
}

impl Direction {
    /// Instruction shown above the prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::EnToKo => "What does this English word mean?",
            Self::KoToEn => "Which English word matches this meaning?",
        }
    }

    pub fn prompt_of<'a>(&self, pair: &'a TermPair) -> &'a str {
        match self {
            Self::EnToKo => &pair.english,
            Self::KoToEn => &pair.korean,
        }
    }

    pub fn answer_of<'a>(&self, pair: &'a TermPair) -> &'a str {
        match self {
            Self::EnToKo => &pair.korean,
            Self::KoToEn => &pair.english,
        }
    }
}

/// A multiple-choice flashcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub direction: Direction,
    pub prompt: String,
    pub correct_answer: String,
    /// The correct answer plus up to three distractors, shuffled.
    pub choices: Vec<String>,
}

impl Flashcard {
    pub fn is_correct(&self, choice: &str) -> bool {
        choice == self.correct_answer
    }
}

/// A counted learning action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyEvent {
    PageRead,
    SpeakingPractice,
    QuizAttempt { correct: bool },
}

/// A finished story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedItem {
    pub id: StoryId,
    pub title: String,
    pub completed_date: NaiveDate,
}

/// Cumulative learning statistics, persisted as a single record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    #[serde(default)]
    pub total_pages_read: u64,
    #[serde(default)]
    pub total_speaking_practice: u64,
    #[serde(default)]
    pub total_quiz_attempts: u64,
    #[serde(default)]
    pub total_quiz_correct: u64,
    #[serde(default, alias = "completed_stories")]
    pub completed_items: Vec<CompletedItem>,
    #[serde(default)]
    pub last_study_date: Option<NaiveDate>,
    #[serde(default)]
    pub study_streak: u32,
    #[serde(default)]
    pub study_dates: BTreeSet<NaiveDate>,
}

impl LearningStats {
    /// Quiz accuracy as a whole percentage, 0 when nothing was attempted.
    pub fn quiz_accuracy_percent(&self) -> u32 {
        if self.total_quiz_attempts == 0 {
            0
        } else {
            (self.total_quiz_correct * 100 / self.total_quiz_attempts) as u32
        }
    }

    pub fn total_study_days(&self) -> usize {
        self.study_dates.len()
    }

    pub fn is_completed(&self, id: StoryId) -> bool {
        self.completed_items.iter().any(|c| c.id == id)
    }

    /// The last `n` completions, oldest first.
    pub fn recent_completions(&self, n: usize) -> &[CompletedItem] {
        let start = self.completed_items.len().saturating_sub(n);
        &self.completed_items[start..]
    }

    /// Collapse duplicate completion ids, keeping the first record.
    pub fn dedup_completions(&mut self) {
        let mut seen = BTreeSet::new();
        self.completed_items.retain(|c| seen.insert(c.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_pair_rejects_blank_sides() {
        assert!(TermPair::new("cat", "고양이").is_some());
        assert!(TermPair::new("  ", "고양이").is_none());
        assert!(TermPair::new("cat", "").is_none());
        assert_eq!(TermPair::new(" dog ", " 개 ").unwrap().english, "dog");
    }

    #[test]
    fn test_vocabulary_truncates() {
        let terms: Vec<_> = (0..40)
            .map(|i| TermPair::new(format!("w{i}"), format!("k{i}")).unwrap())
            .collect();
        let vocab = Vocabulary::new("  words  ", terms);
        assert_eq!(vocab.terms.len(), MAX_TERMS);
        assert_eq!(vocab.explanation, "words");
    }

    #[test]
    fn test_story_english_text() {
        let story = Story::new(
            "Cats",
            "manual",
            vec![Page::new("The cat sat.", "고양이가 앉았다."), Page::new("", ""), Page::new("It slept.", "잤다.")],
        );
        assert_eq!(story.english_text(), "The cat sat. It slept.");
    }

    #[test]
    fn test_stats_legacy_key_and_dates() {
        let json = r#"{
            "total_pages_read": 3,
            "completed_stories": [
                {"id": "7f1c0e5e-4f5b-4c39-9a53-8d1f0e2b6a11", "title": "A", "completed_date": "2024-03-01"}
            ],
            "last_study_date": "2024-03-02",
            "study_streak": 2,
            "study_dates": ["2024-03-02", "2024-03-01"]
        }"#;
        let stats: LearningStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_pages_read, 3);
        assert_eq!(stats.completed_items.len(), 1);
        assert_eq!(stats.total_study_days(), 2);
        assert_eq!(stats.last_study_date, NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!(stats.total_quiz_attempts, 0);
    }

    #[test]
    fn test_quiz_accuracy() {
        let mut stats = LearningStats::default();
        assert_eq!(stats.quiz_accuracy_percent(), 0);
        stats.total_quiz_attempts = 3;
        stats.total_quiz_correct = 2;
        assert_eq!(stats.quiz_accuracy_percent(), 66);
    }

    #[test]
    fn test_recent_completions() {
        let mut stats = LearningStats::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..5 {
            stats.completed_items.push(CompletedItem {
                id: Uuid::new_v4(),
                title: format!("S{i}"),
                completed_date: date,
            });
        }
        let recent: Vec<_> = stats.recent_completions(3).iter().map(|c| c.title.as_str()).collect();
        assert_eq!(recent, vec!["S2", "S3", "S4"]);
        assert_eq!(stats.recent_completions(10).len(), 5);
    }
}
