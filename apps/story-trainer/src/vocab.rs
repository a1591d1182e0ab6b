//! Vocabulary extraction for the flashcard quiz.

use crate::gemini::{AiError, GeminiClient};
use crate::models::{Story, TermPair, Vocabulary, MAX_TERMS};
use crate::translate::{Lang, Translator};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};

static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap());

const STOP_WORDS: &[&str] = &[
    "the", "and", "was", "for", "are", "but", "not", "you", "all", "can", "her", "when", "there",
    "use", "your", "how", "said", "each", "she", "which", "their", "will", "way", "about", "many",
    "then", "them", "would", "like", "him", "into", "has", "two", "more", "could", "make", "than",
    "first", "been", "its", "who", "now", "people", "out", "other", "were", "what", "this", "that",
    "with", "have", "from", "they",
];

const VOCAB_HEADERS: &[&str] = &["[vocabulary]", "[단어 목록]"];
const EXPLANATION_HEADERS: &[&str] = &["[explanation]", "[설명]"];
const WORD_LABELS: &[&str] = &["word:", "단어:"];
const MEANING_LABELS: &[&str] = &["meaning:", "뜻:"];
const PLACEHOLDERS: &[&str] = &["english", "korean", "영어", "한국어", "<english>", "<korean>"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("story has no English text")]
    NoText,
    #[error("no vocabulary found")]
    Empty,
}

pub trait VocabularyExtractor {
    fn extract(&self, story: &Story) -> Result<Vocabulary, ExtractError>;
}

/// Asks the generative model for an explanation and a term list.
pub struct AiExtractor<'a> {
    client: &'a GeminiClient,
    max_terms: usize,
}

impl<'a> AiExtractor<'a> {
    pub fn new(client: &'a GeminiClient, max_terms: usize) -> Self {
        Self {
            client,
            max_terms: max_terms.min(MAX_TERMS),
        }
    }
}

fn build_prompt(text: &str, max_terms: usize) -> String {
    format!(
        "You are an English teacher for Korean children. Read the story below.\n\
         First, under the header [Explanation], explain in Korean the key words and grammar \
         a young learner should know.\n\
         Then, under the header [Vocabulary], list up to {max_terms} important words, one per \
         line, exactly in this format:\n\
         - word: <english> | meaning: <korean>\n\n\
         Story:\n{text}"
    )
}

impl VocabularyExtractor for AiExtractor<'_> {
    fn extract(&self, story: &Story) -> Result<Vocabulary, ExtractError> {
        let text = story.english_text();
        if text.is_empty() {
            return Err(ExtractError::NoText);
        }
        let response = self.client.generate(&build_prompt(&text, self.max_terms))?;
        let (explanation, mut terms) = parse_ai_response(&response);
        terms.truncate(self.max_terms);
        debug!(story = %story.id, terms = terms.len(), "model vocabulary parsed");
        Ok(Vocabulary::new(explanation, terms))
    }
}

fn strip_label<'a>(field: &'a str, labels: &[&str]) -> &'a str {
    let field = field.trim();
    let lower = field.to_lowercase();
    labels
        .iter()
        .find(|label| lower.starts_with(*label))
        .map(|label| field[label.len()..].trim())
        .unwrap_or(field)
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.contains(&value.to_lowercase().as_str())
}

/// Parse one `- word: <en> | meaning: <ko>` line.
fn parse_term_line(line: &str) -> Option<TermPair> {
    let body = line.trim().strip_prefix('-')?;
    let (word, meaning) = body.split_once('|')?;
    let english = strip_label(word, WORD_LABELS);
    let korean = strip_label(meaning, MEANING_LABELS);
    if is_placeholder(english) || is_placeholder(korean) {
        return None;
    }
    TermPair::new(english, korean)
}

/// Split a model reply into its explanation and term pairs.
///
/// Text before the vocabulary header is the explanation. Without a header,
/// every line that parses as a term is taken and the rest is explanation.
pub fn parse_ai_response(response: &str) -> (String, Vec<TermPair>) {
    let mut explanation = Vec::new();
    let mut terms = Vec::new();
    let mut in_vocab = false;

    for line in response.lines() {
        let lower = line.trim().to_lowercase();
        if VOCAB_HEADERS.contains(&lower.as_str()) {
            in_vocab = true;
            continue;
        }
        if EXPLANATION_HEADERS.contains(&lower.as_str()) {
            in_vocab = false;
            continue;
        }
        match parse_term_line(line) {
            Some(pair) => terms.push(pair),
            None if !in_vocab => explanation.push(line),
            None => {}
        }
    }

    (explanation.join("\n").trim().to_string(), terms)
}

/// Picks the most frequent content words and translates each one.
pub struct FrequencyExtractor<'a> {
    translator: &'a dyn Translator,
    max_terms: usize,
}

impl<'a> FrequencyExtractor<'a> {
    pub fn new(translator: &'a dyn Translator, max_terms: usize) -> Self {
        Self {
            translator,
            max_terms: max_terms.min(MAX_TERMS),
        }
    }
}

/// Lower-cased words of three or more letters without stop words, most
/// frequent first. Ties keep their first-appearance order.
pub fn frequent_words(text: &str, limit: usize) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for m in WORD_REGEX.find_iter(text) {
        let word = m.as_str().to_lowercase();
        if stop.contains(word.as_str()) {
            continue;
        }
        let count = counts.entry(word.clone()).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // stable sort keeps first-appearance order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(limit);
    order
}

impl VocabularyExtractor for FrequencyExtractor<'_> {
    fn extract(&self, story: &Story) -> Result<Vocabulary, ExtractError> {
        let text = story.english_text();
        if text.is_empty() {
            return Err(ExtractError::NoText);
        }

        let words = frequent_words(&text, self.max_terms);
        let terms: Vec<TermPair> = words
            .iter()
            .filter_map(|word| match self.translator.translate(word, Lang::En, Lang::Ko) {
                Ok(korean) => TermPair::new(word, korean),
                Err(err) => {
                    debug!(word = %word, error = %err, "skipping untranslatable word");
                    None
                }
            })
            .collect();

        if terms.is_empty() {
            return Err(ExtractError::Empty);
        }
        let explanation = format!("{} frequent words from this story.", terms.len());
        Ok(Vocabulary::new(explanation, terms))
    }
}

/// Runs `primary`, then `fallback` on error or empty output. Never fails.
pub struct FallbackExtractor<P, F> {
    primary: Option<P>,
    fallback: F,
}

impl<P: VocabularyExtractor, F: VocabularyExtractor> FallbackExtractor<P, F> {
    pub fn new(primary: Option<P>, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub fn extract_or_empty(&self, story: &Story) -> Vocabulary {
        if let Some(primary) = &self.primary {
            match primary.extract(story) {
                Ok(vocab) if !vocab.is_empty() => return vocab,
                Ok(_) => warn!(story = %story.id, "primary extractor returned no terms"),
                Err(err) => warn!(story = %story.id, error = %err, "primary extractor failed"),
            }
        }

        match self.fallback.extract(story) {
            Ok(vocab) => {
                info!(story = %story.id, terms = vocab.terms.len(), "using frequency vocabulary");
                vocab
            }
            Err(err) => {
                warn!(story = %story.id, error = %err, "vocabulary extraction failed");
                Vocabulary::default()
            }
        }
    }
}

impl<P: VocabularyExtractor, F: VocabularyExtractor> VocabularyExtractor for FallbackExtractor<P, F> {
    fn extract(&self, story: &Story) -> Result<Vocabulary, ExtractError> {
        Ok(self.extract_or_empty(story))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;
    use crate::translate::tests::fake;

    fn story(text: &str) -> Story {
        Story::new("Test", "manual", vec![Page::new(text, "")])
    }

    struct Fixed(Vocabulary);

    impl VocabularyExtractor for Fixed {
        fn extract(&self, _: &Story) -> Result<Vocabulary, ExtractError> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl VocabularyExtractor for Broken {
        fn extract(&self, _: &Story) -> Result<Vocabulary, ExtractError> {
            Err(ExtractError::Empty)
        }
    }

    #[test]
    fn test_parse_english_format() {
        let reply = "[Explanation]\n'sat' is the past of 'sit'.\n\n[Vocabulary]\n\
                     - word: cat | meaning: 고양이\n\
                     - word: sat | meaning: 앉았다\n\
                     - word: english | meaning: korean\n\
                     not a term";
        let (explanation, terms) = parse_ai_response(reply);
        assert_eq!(explanation, "'sat' is the past of 'sit'.");
        assert_eq!(terms, vec![
            TermPair::new("cat", "고양이").unwrap(),
            TermPair::new("sat", "앉았다").unwrap(),
        ]);
    }

    #[test]
    fn test_parse_korean_labels() {
        let reply = "설명입니다.\n[단어 목록]\n- 단어: moon | 뜻: 달\n- 단어: 영어 | 뜻: 한국어\n- 단어:  | 뜻: 빈칸";
        let (explanation, terms) = parse_ai_response(reply);
        assert_eq!(explanation, "설명입니다.");
        assert_eq!(terms, vec![TermPair::new("moon", "달").unwrap()]);
    }

    #[test]
    fn test_parse_without_header() {
        let (explanation, terms) = parse_ai_response("Intro\n- word: sun | meaning: 해");
        assert_eq!(explanation, "Intro");
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn test_frequent_words_ranking() {
        let text = "The dog ran. The cat ran. A cat and a dog and a cat! Up we go.";
        let words = frequent_words(text, 30);
        assert_eq!(words, vec!["cat", "dog", "ran"]);
    }

    #[test]
    fn test_frequent_words_limit_and_case() {
        let words = frequent_words("Apple apple BANANA cherry", 2);
        assert_eq!(words, vec!["apple", "banana"]);
    }

    #[test]
    fn test_frequency_extractor_skips_failed_translations() {
        let dict = fake(&[("cat", "고양이"), ("ran", "달렸다")]);
        let extractor = FrequencyExtractor::new(&dict, 30);
        let vocab = extractor.extract(&story("The dog ran. The cat ran. A cat!")).unwrap();
        let english: Vec<_> = vocab.terms.iter().map(|t| t.english.as_str()).collect();
        assert_eq!(english, vec!["ran", "cat"]);
        assert_eq!(vocab.explanation, "2 frequent words from this story.");
    }

    #[test]
    fn test_frequency_extractor_empty_story() {
        let dict = fake(&[]);
        let extractor = FrequencyExtractor::new(&dict, 30);
        assert!(matches!(extractor.extract(&story("  ")), Err(ExtractError::NoText)));
        assert!(matches!(extractor.extract(&story("a an I")), Err(ExtractError::Empty)));
    }

    #[test]
    fn test_fallback_used_on_error_and_empty() {
        let good = Vocabulary::new("x", vec![TermPair::new("sun", "해").unwrap()]);
        let s = story("sun");

        let chain = FallbackExtractor::new(Some(Broken), Fixed(good.clone()));
        assert_eq!(chain.extract_or_empty(&s), good);

        let chain = FallbackExtractor::new(Some(Fixed(Vocabulary::default())), Fixed(good.clone()));
        assert_eq!(chain.extract_or_empty(&s), good);

        let chain = FallbackExtractor::new(None::<Broken>, Fixed(good.clone()));
        assert_eq!(chain.extract_or_empty(&s), good);
    }

    #[test]
    fn test_fallback_never_errors() {
        let chain = FallbackExtractor::new(Some(Broken), Broken);
        let vocab = chain.extract(&story("sun")).unwrap();
        assert!(vocab.is_empty());
    }
}
